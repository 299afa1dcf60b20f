//! Notebook analyzer plugin
//!
//! Substring and regex heuristics over notebook cell code. Nothing here
//! parses Python; the checks are deliberately shallow hints for the model.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::base::str_arg;
use crate::plugin::{FunctionTool, Param, Plugin};

pub const PLUGIN_NAME: &str = "notebook_analyzer";

static HARDCODED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"=\s*["'][\w\s]+["']"#).expect("valid regex"));
static FOR_LOOP: Lazy<Regex> = Lazy::new(|| Regex::new(r"for .* in .*:").expect("valid regex"));
static IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:from|import)\s+[\w.]+").expect("valid regex"));
static POSITIONAL_ILOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"df\.iloc\[:,\s*\d").expect("valid regex"));

static PIPELINE_STEPS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("Load", r"read_csv|read_excel|pd\.(DataFrame|Series)"),
        ("Clean", r"dropna|fillna|drop\(|astype"),
        ("Transform", r"apply|transform|map|str\."),
        ("Aggregate", r"groupby|agg|sum\(|mean\(|count\("),
        ("Reshape", r"pivot|melt|stack|unstack"),
        ("Filter", r"query|\.loc\[|\.iloc\[|where"),
        ("Combine", r"merge|join|concat"),
        ("Visualize", r"plot|scatter|hist|bar"),
        ("Export", r"to_csv|to_excel|to_json"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid regex")))
    .collect()
});

const CODE: Param = Param::string("code_snippet", "Python code from a notebook cell");

/// Code-quality, import, and pipeline heuristics for notebook cells
#[derive(Debug, Clone, Copy, Default)]
pub struct NotebookAnalyzerPlugin;

impl Plugin for NotebookAnalyzerPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn description(&self) -> &str {
        "Analyze notebook cell code and structure"
    }

    fn functions(&self) -> Vec<FunctionTool> {
        vec![
            FunctionTool::new(
                PLUGIN_NAME,
                "analyze_code_quality",
                "Check Python code for common issues and suggest improvements",
                &[CODE],
                |args| Ok(analyze_code_quality(str_arg(args, "code_snippet")?)),
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "analyze_imports",
                "Extract and analyze imports from a notebook cell",
                &[CODE],
                |args| Ok(analyze_imports(str_arg(args, "code_snippet")?)),
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "summarize_cell",
                "Summarize what a cell does based on its code",
                &[CODE],
                |args| Ok(summarize_cell(str_arg(args, "code_snippet")?)),
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "identify_data_pipeline",
                "Identify data processing steps in pandas code",
                &[CODE],
                |args| Ok(identify_data_pipeline(str_arg(args, "code_snippet")?)),
            ),
            FunctionTool::new(
                PLUGIN_NAME,
                "check_pandas_best_practices",
                "Check if code follows pandas best practices",
                &[CODE],
                |args| Ok(check_pandas_best_practices(str_arg(args, "code_snippet")?)),
            ),
        ]
    }
}

pub fn analyze_code_quality(code: &str) -> String {
    let mut issues = Vec::new();

    if code.contains("def ") && !code.contains("\"\"\"") && !code.contains("'''") {
        issues.push("⚠️  Functions lack docstrings - add documentation");
    }
    if HARDCODED_VALUE.is_match(code) {
        issues.push("⚠️  Possible hardcoded values - consider parameterizing");
    }
    if code.contains(".iterrows()") {
        issues.push(
            "⚠️  Expensive .iterrows() detected - use vectorized pandas operations instead",
        );
    }
    if code.contains(".apply(lambda") {
        issues.push(
            "⚠️  Lambda functions with apply() may be slow - consider vectorized alternatives",
        );
    }
    if code.contains("import")
        && !code.contains("try:")
        && (code.contains("requests") || code.contains("read_csv"))
    {
        issues.push("ℹ️  Consider adding error handling for file/API operations");
    }
    if code.contains("pd.concat") && FOR_LOOP.is_match(code) {
        issues.push("⚠️  Concatenating in loops is slow - collect items and concat once");
    }

    if issues.is_empty() {
        return "✅ Code looks good! No major issues detected.".to_string();
    }
    format!(
        "{}\n\n💡 Tip: Consider profiling critical sections with %timeit or profiling tools.",
        issues.join("\n")
    )
}

pub fn analyze_imports(code: &str) -> String {
    let imports: Vec<&str> = IMPORT_LINE.find_iter(code).map(|m| m.as_str()).collect();
    if imports.is_empty() {
        return "No imports found in this cell.".to_string();
    }

    let mut analysis = vec![format!("Found {} import statement(s):", imports.len())];
    let joined = imports.join("\n");

    if joined.contains("import pandas") && joined.contains("import numpy") {
        analysis.push("✓ Core data science libraries (pandas, numpy) found".to_string());
    }
    if joined.contains("import matplotlib") || joined.contains("import seaborn") {
        analysis.push("✓ Visualization libraries loaded".to_string());
    }
    if joined.contains("import warnings") {
        analysis.push("✓ Warning management enabled".to_string());
    }
    if code.contains("pd.read_csv") && !joined.contains("import pandas") {
        analysis.push(
            "⚠️  Using pandas but pandas not imported - ensure it's in a prior cell".to_string(),
        );
    }
    if joined.contains("import *") {
        analysis.push(
            "⚠️  Wildcard imports detected - explicitly list imported names for clarity"
                .to_string(),
        );
    }

    analysis.push("\nImports detected:".to_string());
    analysis.extend(imports.iter().map(|imp| format!("  • {}", imp)));
    analysis.join("\n")
}

pub fn summarize_cell(code: &str) -> String {
    let any = |needles: &[&str]| needles.iter().any(|n| code.contains(n));
    let checks: [(&[&str], &str); 9] = [
        (&["read_csv", "pd.read"], "Loading data from file"),
        (&["describe()", "info()"], "Examining data structure and statistics"),
        (&["dropna", "fillna"], "Handling missing values"),
        (&["groupby"], "Aggregating data by groups"),
        (&["pivot", "unstack"], "Reshaping data"),
        (&["merge", "join"], "Combining multiple datasets"),
        (&["plot", "scatter", "hist"], "Creating visualizations"),
        (&["apply", "transform"], "Applying transformations to data"),
        (&["export", "to_csv", "to_excel"], "Exporting processed data"),
    ];

    let actions: Vec<&str> = checks
        .iter()
        .filter(|(needles, _)| any(needles))
        .map(|(_, action)| *action)
        .collect();

    if actions.is_empty() {
        return "General Python code execution".to_string();
    }
    format!("This cell: {}", actions.join(", then "))
}

pub fn identify_data_pipeline(code: &str) -> String {
    let steps: Vec<&str> = PIPELINE_STEPS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(code))
        .map(|(name, _)| *name)
        .collect();

    if steps.is_empty() {
        return "Standard Python data processing (no pandas operations detected)".to_string();
    }
    format!("Data Pipeline: {}", steps.join(" → "))
}

pub fn check_pandas_best_practices(code: &str) -> String {
    let mut recommendations = Vec::new();

    if code.contains(".dropna(inplace=True)") || code.contains(".fillna(inplace=True)") {
        recommendations
            .push("💡 Avoid inplace=True - use assignment instead: `df = df.dropna()`");
    }
    if code.contains(".loc[") && (!code.contains(".copy()") || code.contains(".iloc[")) {
        recommendations.push(
            "⚠️  Use .copy() when creating DataFrame subsets to avoid SettingWithCopyWarning",
        );
    }
    if !code.contains(".reset_index()") && code.contains("groupby") {
        recommendations
            .push("💡 Consider reset_index() after groupby() to restore MultiIndex as columns");
    }
    if POSITIONAL_ILOC.is_match(code) {
        recommendations.push("💡 Use column names instead of positional indexing for clarity");
    }
    if code.contains("read_csv") && !code.contains("dtype") {
        recommendations.push(
            "💡 Specify dtype in read_csv() to control data types and improve performance",
        );
    }

    if recommendations.is_empty() {
        recommendations.push("✅ Pandas code follows best practices!");
    }
    recommendations.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_code_passes() {
        assert_eq!(
            analyze_code_quality("x = 1 + 2"),
            "✅ Code looks good! No major issues detected."
        );
    }

    #[test]
    fn test_quality_flags_iterrows_and_missing_docstring() {
        let code = "def f(df):\n    for i, row in df.iterrows():\n        pass";
        let report = analyze_code_quality(code);
        assert!(report.starts_with("⚠️  Functions lack docstrings"));
        assert!(report.contains(".iterrows()"));
        assert!(report.ends_with("profiling tools."));
    }

    #[test]
    fn test_quality_flags_unprotected_io() {
        let report = analyze_code_quality("import pandas as pd\ndf = pd.read_csv(path)");
        assert!(report.contains("Consider adding error handling"));
    }

    #[test]
    fn test_analyze_imports() {
        let code = "import pandas as pd\nimport numpy as np\nfrom matplotlib import pyplot\nx = 1";
        let report = analyze_imports(code);
        assert!(report.starts_with("Found 3 import statement(s):"));
        assert!(report.contains("✓ Core data science libraries"));
        assert!(!report.contains("✓ Visualization libraries loaded"));
        assert!(report.contains("  • from matplotlib"));

        assert_eq!(analyze_imports("x = 1"), "No imports found in this cell.");
    }

    #[test]
    fn test_summarize_cell_orders_actions() {
        let summary = summarize_cell("df = pd.read_csv('a.csv')\ndf.groupby('k').sum().plot()");
        assert_eq!(
            summary,
            "This cell: Loading data from file, then Aggregating data by groups, then Creating visualizations"
        );
        assert_eq!(summarize_cell("print(1)"), "General Python code execution");
    }

    #[test]
    fn test_identify_data_pipeline() {
        let code = "df = pd.read_csv('x')\ndf = df.dropna()\ndf.to_csv('y')";
        assert_eq!(identify_data_pipeline(code), "Data Pipeline: Load → Clean → Export");
        assert_eq!(
            identify_data_pipeline("print(1)"),
            "Standard Python data processing (no pandas operations detected)"
        );
    }

    #[test]
    fn test_check_pandas_best_practices() {
        let report = check_pandas_best_practices("df.dropna(inplace=True)\ndf.groupby('a')");
        assert!(report.contains("Avoid inplace=True"));
        assert!(report.contains("reset_index()"));
        assert_eq!(
            check_pandas_best_practices("df = df.copy()"),
            "✅ Pandas code follows best practices!"
        );
    }

    #[test]
    fn test_plugin_exposes_five_functions() {
        let functions = NotebookAnalyzerPlugin.functions();
        assert_eq!(functions.len(), 5);
        let out = functions[2]
            .call(&json!({"code_snippet": "df.merge(other)"}))
            .unwrap();
        assert_eq!(out, "This cell: Combining multiple datasets");
    }
}
