use chrono_tz::Tz;
use crossterm::style::Stylize;

use crate::types::{HistogramBin, Stats, WeeklyPoint};
use crate::utils::{NumberFormatOptions, format_average, format_day, format_number};

const BAR_WIDTH: usize = 40;

/// Summary cards plus the messages-by-model table.
pub fn print_summary(stats: &Stats, tz: &Tz, format_options: &NumberFormatOptions) {
    println!();
    println!("{}", "YOUR USAGE SUMMARY".cyan().bold());
    println!("{}", "==================".cyan().bold());
    println!();

    let cards = [
        ("Total Messages", format_number(stats.total_messages(), format_options)),
        ("Conversations", format_number(stats.conversation_count, format_options)),
        ("Avg Messages/Day", format_average(stats.average_messages_per_day)),
        ("Models Used", format_number(stats.models_used() as u64, format_options)),
        ("First Message", format_day(stats.first_message_date, tz)),
        (
            "Longest Chat",
            format!("{} messages", format_number(stats.longest_chat, format_options)),
        ),
    ];
    for (title, value) in cards {
        println!("  {} {}", format!("{title:<18}").dim(), value.bold());
    }

    println!();
    println!(
        "  {} {} / {}",
        format!("{:<18}", "Characters").dim(),
        format_number(stats.user_char_count, format_options),
        format_number(stats.assistant_char_count, format_options)
    );
    println!("  {}", "(you / assistant)".dim());

    let models = stats.models_by_usage();
    if models.is_empty() {
        return;
    }

    println!();
    println!("{}", "Messages by Model".bold());
    let total: u64 = models.iter().map(|(_, count)| count).sum();
    for (model, count) in models {
        let share = if total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / total as f64
        };
        println!(
            "  {:<28} {:>10} {:>5.1}%",
            model,
            format_number(count, format_options),
            share
        );
    }
}

/// Horizontal bar rendering of the chat length distribution.
pub fn print_histogram(bins: &[HistogramBin], format_options: &NumberFormatOptions) {
    println!("{}", "Chat Length Distribution".bold());
    let max = bins.iter().map(|b| b.count).max().unwrap_or(0);
    for bin in bins {
        println!(
            "  {:>7} {:>8} {}",
            bin.range,
            format_number(bin.count, format_options),
            bar(bin.count, max).blue()
        );
    }
}

/// One line per week with the weekly total as a bar.
pub fn print_weekly(series: &[WeeklyPoint], format_options: &NumberFormatOptions) {
    println!("{}", "Weekly Message Count".bold());
    if series.is_empty() {
        println!("  {}", "No messages".dim());
        return;
    }
    let max = series.iter().map(|p| p.total).max().unwrap_or(0);
    for point in series {
        println!(
            "  {:<13} {:>8} {}",
            point.week,
            format_number(point.total, format_options),
            bar(point.total, max).green()
        );
    }
}

fn bar(value: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (value as f64 / max as f64 * BAR_WIDTH as f64).round() as usize;
    "█".repeat(width)
}
