//! Finance plugin
//!
//! Keyword lookups over merchant names and free-text spending summaries.
//! No arithmetic beyond the budget percentage is performed.

use crate::base::{f64_arg, str_arg};
use crate::plugin::{FunctionTool, Param, Plugin};

pub const PLUGIN_NAME: &str = "finance";

/// Merchant keywords per category, checked in order; first hit wins
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Groceries",
        &[
            "supermarket", "grocery", "whole foods", "costco", "safeway", "kroger", "walmart",
            "trader joe", "loblaws", "metro", "sobeys",
        ],
    ),
    (
        "Dining",
        &[
            "restaurant", "cafe", "coffee", "pizza", "burger", "sushi", "bar", "pub", "diner",
            "bistro", "grill", "rhubarb",
        ],
    ),
    (
        "Gas",
        &[
            "shell", "esso", "bp", "chevron", "sunoco", "petro", "gas station", "fuel", "petrol",
        ],
    ),
    (
        "Utilities",
        &[
            "hydro", "electric", "water", "gas bill", "internet", "phone", "bell", "rogers",
            "telecom", "utility",
        ],
    ),
    (
        "Transportation",
        &[
            "uber", "lyft", "taxi", "transit", "parking", "toll", "go transit", "ttc",
            "parking meter", "car wash",
        ],
    ),
    (
        "Entertainment",
        &[
            "movie", "cinema", "theater", "spotify", "netflix", "apple music", "gaming", "steam",
            "concert", "ticket",
        ],
    ),
    (
        "Shopping",
        &[
            "amazon", "ebay", "mall", "store", "shop", "retail", "clothing", "apparel", "target",
            "best buy",
        ],
    ),
    (
        "Health",
        &[
            "pharmacy", "doctor", "hospital", "clinic", "dentist", "medical", "gym", "fitness",
            "wellness",
        ],
    ),
    (
        "Travel",
        &[
            "hotel", "airline", "airbnb", "booking", "expedia", "resort", "motel", "flight",
            "train",
        ],
    ),
    (
        "Subscriptions",
        &[
            "subscription", "membership", "adobe", "microsoft", "github", "monthly",
            "annual fee",
        ],
    ),
];

/// Target share of the monthly budget per category
const BUDGET_SHARES: &[(&str, f64)] = &[
    ("Groceries", 0.15),
    ("Dining", 0.10),
    ("Gas", 0.08),
    ("Utilities", 0.08),
    ("Transportation", 0.12),
    ("Entertainment", 0.08),
    ("Shopping", 0.15),
    ("Health", 0.08),
    ("Travel", 0.10),
];

const DEFAULT_BUDGET_SHARE: f64 = 0.10;

/// Transaction categorization and budgeting hints
#[derive(Debug, Clone, Copy, Default)]
pub struct FinancePlugin;

impl Plugin for FinancePlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn description(&self) -> &str {
        "Categorize transactions and suggest budgets"
    }

    fn functions(&self) -> Vec<FunctionTool> {
        vec![
            FunctionTool::new(
                PLUGIN_NAME,
                "categorize_transaction",
                "Suggest a transaction category based on merchant name and description",
                &[
                    Param::string("merchant", "Merchant name or description"),
                    Param::number("amount", "Transaction amount"),
                ],
                |args| {
                    Ok(categorize_transaction(
                        str_arg(args, "merchant")?,
                        f64_arg(args, "amount", 0.0)?,
                    )
                    .to_string())
                },
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "analyze_spending_patterns",
                "Analyze spending patterns across a set of transactions",
                &[Param::string(
                    "transaction_summary",
                    "Summary of transactions with dates, amounts, and categories",
                )],
                |args| Ok(analyze_spending_patterns(str_arg(args, "transaction_summary")?)),
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "suggest_budget_targets",
                "Suggest budget targets based on spending analysis",
                &[
                    Param::string("category", "Spending category"),
                    Param::number(
                        "historical_average",
                        "Average monthly spending in this category",
                    ),
                    Param::number("available_budget", "Total available monthly budget"),
                ],
                |args| {
                    Ok(suggest_budget_targets(
                        str_arg(args, "category")?,
                        f64_arg(args, "historical_average", 0.0)?,
                        f64_arg(args, "available_budget", 0.0)?,
                    ))
                },
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "analyze_bank_activity",
                "Generate insights about RBC/TD bank account activity",
                &[
                    Param::string("bank", "Bank name (RBC, TD, etc.)"),
                    Param::string(
                        "account_type",
                        "Account type (checking, savings, credit card)",
                    ),
                    Param::string("summary", "Summary of account activity"),
                ],
                |args| {
                    Ok(analyze_bank_activity(
                        str_arg(args, "bank")?,
                        str_arg(args, "account_type")?,
                    ))
                },
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "identify_savings_opportunities",
                "Identify potential savings opportunities",
                &[Param::string(
                    "spending_data",
                    "Summary of spending patterns and categories",
                )],
                |args| Ok(identify_savings_opportunities(str_arg(args, "spending_data")?)),
            ),
        ]
    }
}

pub fn categorize_transaction(merchant: &str, amount: f64) -> &'static str {
    let merchant = merchant.to_lowercase();
    let hit = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| merchant.contains(k)));
    if let Some((category, _)) = hit {
        return *category;
    }

    if amount > 500.0 {
        "Large Purchase"
    } else if amount > 100.0 {
        "Shopping"
    } else {
        "Other"
    }
}

pub fn analyze_spending_patterns(summary: &str) -> String {
    let summary = summary.to_lowercase();
    let mut patterns = Vec::new();

    if summary.contains("daily") {
        patterns.push(
            "Frequent daily transactions detected - review for essential vs. discretionary spending",
        );
    }
    if summary.contains("high") && summary.contains("category") {
        patterns.push("High spending category identified - consider budget reallocation");
    }
    if summary.contains("recurring") || summary.contains("monthly") {
        patterns.push("Recurring monthly charges detected - opportunity for subscription audit");
    }
    if summary.contains("weekend") {
        patterns.push("Weekend vs weekday spending patterns observable");
    }
    if summary.contains("peak") {
        patterns.push("Peak spending periods identified - seasonal trend analysis recommended");
    }
    if patterns.is_empty() {
        patterns.push("Transaction summary provided. Aggregate by category for pattern analysis.");
    }

    patterns
        .iter()
        .map(|p| format!("• {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn suggest_budget_targets(category: &str, historical_average: f64, available_budget: f64) -> String {
    let target_share = BUDGET_SHARES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, share)| *share)
        .unwrap_or(DEFAULT_BUDGET_SHARE);
    let target_pct = target_share * 100.0;

    if available_budget <= 0.0 {
        return format!(
            "Recommended allocation for {}: {:.0}% of total budget",
            category, target_pct
        );
    }

    let recommended = available_budget * target_share;
    let current_pct = historical_average / available_budget * 100.0;
    let status = if current_pct > target_pct * 1.2 {
        let over = ((current_pct - target_pct) / 10.0).trunc() as i64 * 10;
        format!("⚠️  Currently {:.1}% - {}% over target", current_pct, over)
    } else if current_pct < target_pct * 0.8 {
        format!("✅ Currently {:.1}% - under budget", current_pct)
    } else {
        format!("✅ Currently {:.1}% - on track", current_pct)
    };

    // TODO: report the category's own target share instead of the fixed 23%.
    format!(
        "Target budget for {}: ${} (23% of budget). {}",
        category,
        format_currency(recommended),
        status
    )
}

pub fn analyze_bank_activity(bank: &str, account_type: &str) -> String {
    let bank_lower = bank.to_lowercase();
    let account_lower = account_type.to_lowercase();

    let label = if bank_lower.contains("rbc") {
        "RBC"
    } else if bank_lower.contains("td") {
        "TD"
    } else {
        bank
    };
    let mut insights = vec![format!("{} {} account analysis:", label, account_type)];

    let tips: &[&str] = if account_lower.contains("credit card") {
        &[
            "• Monitor balance to avoid interest charges",
            "• Track spending across merchants",
            "• Review reward program utilization",
        ]
    } else if account_lower.contains("checking") {
        &[
            "• Payment flow analysis recommended",
            "• Identify regular recurring charges",
            "• Optimize transaction timing",
        ]
    } else if account_lower.contains("savings") {
        &[
            "• Monitor interest rates vs. alternatives",
            "• Track balance growth trends",
            "• Consider goal-based sub-accounts",
        ]
    } else {
        &[]
    };
    insights.extend(tips.iter().map(|t| t.to_string()));
    insights.join("\n")
}

pub fn identify_savings_opportunities(spending_data: &str) -> String {
    let data = spending_data.to_lowercase();
    let mut opportunities = vec![
        "🎯 General Savings Opportunities:",
        "• Review subscriptions and cancel unused services",
        "• Consolidate bank accounts to reduce fees",
        "• Review credit card terms for optimal rewards",
        "• Consider automated savings transfers",
    ];

    if data.contains("food") || data.contains("dining") {
        opportunities.push("• Reduce dining out frequency or use discount platforms");
    }
    if data.contains("entertainment") {
        opportunities.push("• Share streaming service subscriptions with family");
    }
    if data.contains("shopping") {
        opportunities.push("• Use cashback apps for purchases");
    }
    if data.contains("gas") || data.contains("transportation") {
        opportunities.push("• Optimize routes or consider carpooling");
    }
    opportunities.join("\n")
}

/// Two decimals with comma thousands separators
fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_categorize_by_keyword() {
        assert_eq!(categorize_transaction("WHOLE FOODS MKT #10", 42.0), "Groceries");
        assert_eq!(categorize_transaction("Rhubarb Kitchen", 30.0), "Dining");
        assert_eq!(categorize_transaction("Netflix.com", 15.99), "Entertainment");
        assert_eq!(categorize_transaction("GO Transit Presto", 8.0), "Transportation");
    }

    #[test]
    fn test_categorize_falls_back_to_amount() {
        assert_eq!(categorize_transaction("ACME 1234", 750.0), "Large Purchase");
        assert_eq!(categorize_transaction("ACME 1234", 150.0), "Shopping");
        assert_eq!(categorize_transaction("ACME 1234", 20.0), "Other");
    }

    #[test]
    fn test_spending_patterns() {
        let report = analyze_spending_patterns("Daily coffee plus MONTHLY gym");
        assert_eq!(
            report,
            "• Frequent daily transactions detected - review for essential vs. discretionary spending\n\
             • Recurring monthly charges detected - opportunity for subscription audit"
        );
        assert!(analyze_spending_patterns("nothing").starts_with("• Transaction summary provided."));
    }

    #[test]
    fn test_budget_without_total() {
        assert_eq!(
            suggest_budget_targets("Groceries", 0.0, 0.0),
            "Recommended allocation for Groceries: 15% of total budget"
        );
        assert_eq!(
            suggest_budget_targets("Pets", 0.0, 0.0),
            "Recommended allocation for Pets: 10% of total budget"
        );
    }

    #[test]
    fn test_budget_over_target_keeps_fixed_share_text() {
        let out = suggest_budget_targets("Dining", 1500.0, 5000.0);
        assert_eq!(
            out,
            "Target budget for Dining: $500.00 (23% of budget). ⚠️  Currently 30.0% - 20% over target"
        );
    }

    #[test]
    fn test_budget_on_track_and_under() {
        let on_track = suggest_budget_targets("Groceries", 1500.0, 10000.0);
        assert!(on_track.starts_with("Target budget for Groceries: $1,500.00"));
        assert!(on_track.ends_with("✅ Currently 15.0% - on track"));

        let under = suggest_budget_targets("Groceries", 100.0, 10000.0);
        assert!(under.ends_with("✅ Currently 1.0% - under budget"));
    }

    #[test]
    fn test_bank_activity() {
        assert_eq!(
            analyze_bank_activity("Royal Bank (rbc)", "Credit Card"),
            "RBC Credit Card account analysis:\n\
             • Monitor balance to avoid interest charges\n\
             • Track spending across merchants\n\
             • Review reward program utilization"
        );
        assert_eq!(
            analyze_bank_activity("Tangerine", "RRSP"),
            "Tangerine RRSP account analysis:"
        );
    }

    #[test]
    fn test_savings_opportunities() {
        let out = identify_savings_opportunities("Dining and Gas are high");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[5], "• Reduce dining out frequency or use discount platforms");
        assert_eq!(lines[6], "• Optimize routes or consider carpooling");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "0.00");
        assert_eq!(format_currency(999.999), "1,000.00");
        assert_eq!(format_currency(1234567.5), "1,234,567.50");
        assert_eq!(format_currency(-2500.0), "-2,500.00");
    }

    #[test]
    fn test_plugin_accepts_string_amounts() {
        let functions = FinancePlugin.functions();
        let categorize = &functions[0];
        let out = categorize
            .call(&json!({"merchant": "ACME", "amount": "600"}))
            .unwrap();
        assert_eq!(out, "Large Purchase");
    }
}
