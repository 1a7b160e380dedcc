//! Indian-rupee amount formatting (en-IN digit grouping: `₹12,34,567`).

use std::fmt::Write;

pub const RUPEE: char = '₹';

/// Formats an amount the way the site renders prices.
///
/// Like `toLocaleString('en-IN')`, up to three fraction digits are kept and
/// trailing zeros dropped (`₹1,500.5`, `₹1,500.125`).
pub fn format_inr(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("{}0", RUPEE);
    }

    let milli = (amount.abs() * 1000.0).round() as u64;
    let whole = milli / 1000;
    let fraction = milli % 1000;

    let mut out = String::new();
    if amount < 0.0 && milli > 0 {
        out.push('-');
    }
    out.push(RUPEE);
    out.push_str(&group_indian(whole));

    if fraction != 0 {
        let digits = format!("{:03}", fraction);
        let _ = write!(out, ".{}", digits.trim_end_matches('0'));
    }

    out
}

/// Last three digits form one group, then groups of two.
pub fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, last_two) = rest.split_at(rest.len() - 2);
        groups.push(last_two);
        rest = front;
    }
    groups.push(rest);
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
