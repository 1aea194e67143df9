//! Human-readable output formatting

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::api::types::{
    Balance, FinancialSummary, ScheduledTransfer, Transaction, Trend, WalletCard,
};
use crate::auth::{Session, SessionStatus};
use crate::chart::{axis_max, axis_ticks, format_axis_tick, ChartDataPoint, TimeFilter};
use crate::format::{
    format_currency, format_date, format_relative_time, mask_card_number, parse_date,
};

pub fn session(session: &Session) -> String {
    match (&session.status, &session.user) {
        (SessionStatus::Authenticated, Some(user)) => {
            let mut out = format!(
                "{} Signed in as {} <{}>\n",
                "●".green(),
                user.full_name.bold(),
                user.email
            );
            if let Some(role) = &user.role {
                out.push_str(&format!("  Role: {}\n", role));
            }
            out
        }
        (SessionStatus::Authenticating, _) => "Signing in...\n".to_string(),
        (SessionStatus::LoggingOut, _) => "Signing out...\n".to_string(),
        _ => {
            let mut out = format!("{} Not signed in\n", "○".dimmed());
            if let Some(error) = &session.error {
                out.push_str(&format!("  Last error: {}\n", error.red()));
            }
            out.push_str("  Run `finboard login` to sign in.\n");
            out
        }
    }
}

fn balance_line(label: &str, balance: &Balance) -> String {
    let amount = format_currency(balance.amount, &balance.currency);
    let change = match &balance.change {
        Some(change) => {
            let text = format!("{:.1}%", change.percentage);
            match change.trend {
                Trend::Up => format!("  ▲ {}", text).green().to_string(),
                Trend::Down => format!("  ▼ {}", text).red().to_string(),
            }
        }
        None => String::new(),
    };
    format!("  {:<16}{:>18}{}\n", label, amount, change)
}

pub fn summary(summary: &FinancialSummary) -> String {
    let mut out = format!("{}\n", "Summary".bold());
    out.push_str(&balance_line("Total balance", &summary.total_balance));
    out.push_str(&balance_line("Total spending", &summary.total_expense));
    out.push_str(&balance_line("Total saved", &summary.total_savings));
    out
}

pub fn transactions(transactions: &[Transaction], now: DateTime<Utc>) -> String {
    if transactions.is_empty() {
        return "No recent transactions\n".to_string();
    }

    let mut out = format!("{}\n", "Recent transactions".bold());
    for tx in transactions {
        let when = parse_date(&tx.date)
            .map(|date| format_relative_time(date, now))
            .unwrap_or_else(|| tx.date.clone());
        let business = tx.business.as_deref().unwrap_or("");
        out.push_str(&format!(
            "  {:<24} {:<18} {:<10} {:>14}  {}\n",
            truncate(&tx.name, 24),
            truncate(business, 18),
            tx.kind,
            format_currency(tx.amount, &tx.currency),
            when.dimmed()
        ));
    }
    out
}

pub fn capital(points: &[ChartDataPoint], currency: &str, filter: TimeFilter) -> String {
    if points.is_empty() {
        return "No chart data available\n".to_string();
    }

    let mut out = format!("{} ({})\n", "Working capital".bold(), filter.label());
    out.push_str(&format!(
        "  {:<10}{:>16}{:>16}{:>16}\n",
        "Period", "Income", "Expenses", "Net"
    ));
    for point in points {
        let net = point.net_flow();
        let net_text = format_currency(net, currency);
        let net_text = if net < 0.0 {
            net_text.red()
        } else {
            net_text.green()
        };
        out.push_str(&format!(
            "  {:<10}{:>16}{:>16}{:>16}\n",
            point.period_label,
            format_currency(point.income, currency),
            format_currency(point.expense, currency),
            net_text
        ));
    }

    let ticks: Vec<String> = axis_ticks(axis_max(points))
        .into_iter()
        .map(format_axis_tick)
        .collect();
    out.push_str(&format!("  Axis: {}\n", ticks.join(" ").dimmed()));
    out
}

pub fn wallet(cards: &[WalletCard]) -> String {
    if cards.is_empty() {
        return "No cards in wallet\n".to_string();
    }

    let mut out = format!("{}\n", "Wallet".bold());
    for card in cards {
        let default_marker = if card.is_default { " (default)" } else { "" };
        out.push_str(&format!(
            "  {}{}\n    {}  {}  {:02}/{}\n",
            card.name.bold(),
            default_marker,
            mask_card_number(&card.card_number),
            card.network,
            card.expiry_month,
            card.expiry_year % 100
        ));
    }
    out
}

pub fn transfers(transfers: &[ScheduledTransfer]) -> String {
    if transfers.is_empty() {
        return "No scheduled transfers\n".to_string();
    }

    let mut out = format!("{}\n", "Scheduled transfers".bold());
    for transfer in transfers {
        out.push_str(&format!(
            "  {:<24} {:<14} {:>14}  {}\n",
            truncate(&transfer.name, 24),
            format_date(&transfer.date),
            format_currency(transfer.amount, &transfer.currency),
            transfer.status.dimmed()
        ));
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
