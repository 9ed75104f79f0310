use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::entities::financial_transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub const ALL: [&'static str; 2] = ["income", "expense"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<NaiveDateTime>,
}

impl LedgerEntry {
    pub fn from_model(model: &financial_transaction::Model) -> Option<Self> {
        Some(Self {
            kind: TransactionKind::parse(&model.kind)?,
            amount_cents: model.amount_cents,
            due_date: model.due_date,
            paid_at: model.paid_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinanceSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub income_cents: i64,
    pub expense_cents: i64,
    pub balance_cents: i64,
    pub pending_receivables_cents: i64,
    pub pending_payables_cents: i64,
    pub overdue_receivables: usize,
    pub overdue_payables: usize,
}

/// Paid totals inside `[from, to]`, unpaid totals due in that window (or
/// undated), and overdue counts relative to `today`.
pub fn summarize(
    entries: &[LedgerEntry],
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> FinanceSummary {
    let mut summary = FinanceSummary {
        from,
        to,
        income_cents: 0,
        expense_cents: 0,
        balance_cents: 0,
        pending_receivables_cents: 0,
        pending_payables_cents: 0,
        overdue_receivables: 0,
        overdue_payables: 0,
    };

    for entry in entries {
        match entry.paid_at {
            Some(paid_at) => {
                let day = paid_at.date();
                if day < from || day > to {
                    continue;
                }
                match entry.kind {
                    TransactionKind::Income => {
                        summary.income_cents = summary.income_cents.saturating_add(entry.amount_cents)
                    }
                    TransactionKind::Expense => {
                        summary.expense_cents = summary.expense_cents.saturating_add(entry.amount_cents)
                    }
                }
            }
            None => {
                let in_window = entry.due_date.map_or(true, |d| d >= from && d <= to);
                let overdue = entry.due_date.map_or(false, |d| d < today);
                match entry.kind {
                    TransactionKind::Income => {
                        if in_window {
                            summary.pending_receivables_cents =
                                summary.pending_receivables_cents.saturating_add(entry.amount_cents);
                        }
                        if overdue {
                            summary.overdue_receivables += 1;
                        }
                    }
                    TransactionKind::Expense => {
                        if in_window {
                            summary.pending_payables_cents =
                                summary.pending_payables_cents.saturating_add(entry.amount_cents);
                        }
                        if overdue {
                            summary.overdue_payables += 1;
                        }
                    }
                }
            }
        }
    }

    summary.balance_cents = summary.income_cents.saturating_sub(summary.expense_cents);
    summary
}

/// Days billed for a stay: started 24h periods, at least one.
pub fn days_charged(admitted_at: NaiveDateTime, until: NaiveDateTime) -> i64 {
    let minutes = (until - admitted_at).num_minutes().max(0);
    let day = 24 * 60;
    ((minutes + day - 1) / day).max(1)
}

pub fn stay_total_cents(admitted_at: NaiveDateTime, until: NaiveDateTime, daily_rate_cents: i64) -> i64 {
    days_charged(admitted_at, until).saturating_mul(daily_rate_cents)
}
