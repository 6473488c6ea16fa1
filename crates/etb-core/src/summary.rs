//! Per-category aggregation of a user's rows.
//!
//! Categories are grouped by exact string match (case-sensitive, untrimmed).

use std::collections::HashMap;

use crate::{
    domain::ExpenseRow,
    formatting::{escape_html, format_amount},
};

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    /// Sorted by total, largest first; ties by category name.
    pub by_category: Vec<CategoryTotal>,
    pub total: f64,
    /// Newest first.
    pub recent: Vec<ExpenseRow>,
}

impl Summary {
    pub fn from_rows(rows: &[ExpenseRow], recent_limit: usize) -> Self {
        let mut totals: HashMap<&str, f64> = HashMap::new();
        for row in rows {
            *totals.entry(row.category.as_str()).or_default() += row.amount;
        }

        let mut by_category: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(category, total)| CategoryTotal {
                category: category.to_string(),
                total,
            })
            .collect();
        by_category.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.category.cmp(&b.category))
        });

        let total = rows.iter().map(|r| r.amount).sum();
        let recent = rows.iter().rev().take(recent_limit).cloned().collect();

        Self {
            by_category,
            total,
            recent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn total_for(&self, category: &str) -> Option<f64> {
        self.by_category
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.total)
    }

    /// Telegram HTML rendering.
    pub fn to_html(&self) -> String {
        self.to_html_within(usize::MAX)
    }

    /// Render into at most `max_len` bytes when the budget allows it.
    ///
    /// Whole lines are dropped from the end of a section and replaced by an
    /// "…and N more" line, so every tag stays closed and the total is always shown.
    pub fn to_html_within(&self, max_len: usize) -> String {
        if self.is_empty() {
            return EMPTY.to_string();
        }

        let footer = format!("\n<b>Total Expenses:</b> {}", format_amount(self.total));
        let recent: Vec<String> = self
            .recent
            .iter()
            .map(|row| {
                format!(
                    "• {}: {} - {}\n",
                    escape_html(row.date()),
                    label(&row.category),
                    format_amount(row.amount)
                )
            })
            .collect();
        let categories: Vec<String> = self
            .by_category
            .iter()
            .map(|c| {
                format!(
                    "• {}: {} ({:.1}%)\n",
                    label(&c.category),
                    format_amount(c.total),
                    percent(c.total, self.total)
                )
            })
            .collect();

        let mut out = String::from(HEADER);
        if !recent.is_empty() {
            let reserve = footer.len() + CATEGORY_TITLE.len() + 2 * OVERFLOW_RESERVE;
            push_section(
                &mut out,
                RECENT_TITLE,
                &recent,
                max_len.saturating_sub(reserve),
            );
        }
        let reserve = footer.len() + OVERFLOW_RESERVE;
        push_section(
            &mut out,
            CATEGORY_TITLE,
            &categories,
            max_len.saturating_sub(reserve),
        );
        out.push_str(&footer);
        out
    }
}

const EMPTY: &str = "No expenses recorded yet.";
const HEADER: &str = "📊 <b>Expense Summary</b>\n";
const RECENT_TITLE: &str = "\n<b>Recent Expenses:</b>\n";
const CATEGORY_TITLE: &str = "\n<b>By Category:</b>\n";
/// Upper bound for one "…and N more" line.
const OVERFLOW_RESERVE: usize = 48;
/// Longer category names are shortened for display.
const MAX_LABEL_CHARS: usize = 64;

/// Append `title` and as many `lines` as keep `out` within `limit` bytes.
fn push_section(out: &mut String, title: &str, lines: &[String], limit: usize) {
    out.push_str(title);
    for (i, line) in lines.iter().enumerate() {
        if out.len() + line.len() > limit {
            out.push_str(&format!("• …and {} more\n", lines.len() - i));
            return;
        }
        out.push_str(line);
    }
}

fn label(category: &str) -> String {
    match category.char_indices().nth(MAX_LABEL_CHARS) {
        Some((end, _)) => format!("{}…", escape_html(&category[..end])),
        None => escape_html(category),
    }
}

fn percent(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}
