use std::path::PathBuf;

use datalab_plugin::{PluginError, PluginResult, Table, Transformer, TransformerInit};
use datalab_schema::ValueTree;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// Repeatable group of columns to extract
const COLUMNS: &str = "columns";

/// Subfolder under the data-set directory outputs are written to
const OUTPUT_FOLDER: &str = "output_folder";

static EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+\-*/])\s*([+\-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+\-]?\d+)?)\s*$")
        .expect("valid column expression regex")
});

/// One arithmetic step applied to a column, such as `*1e3` or `- 0.5`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnExpression {
    /// Copy unchanged
    Identity,
    /// Add a constant
    Add(f64),
    /// Subtract a constant
    Sub(f64),
    /// Multiply by a constant
    Mul(f64),
    /// Divide by a constant
    Div(f64),
}

impl ColumnExpression {
    /// Parse `<op><number>`; blank text is [`Identity`](Self::Identity)
    ///
    /// # Errors
    /// Returns [`PluginError::InvalidParam`] for anything else
    pub fn parse(text: &str) -> PluginResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::Identity);
        }
        let invalid = || {
            PluginError::invalid_param(
                "expression",
                format!("cannot evaluate '{text}': expected an operator (+ - * /) followed by a number"),
            )
        };
        let caps = EXPRESSION_RE.captures(text).ok_or_else(invalid)?;
        let operand: f64 = caps[2].parse().map_err(|_| invalid())?;
        Ok(match &caps[1] {
            "+" => Self::Add(operand),
            "-" => Self::Sub(operand),
            "*" => Self::Mul(operand),
            _ => Self::Div(operand),
        })
    }

    /// Apply to one value
    #[inline]
    #[must_use]
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Add(c) => x + c,
            Self::Sub(c) => x - c,
            Self::Mul(c) => x * c,
            Self::Div(c) => x / c,
        }
    }
}

#[derive(Debug, Clone)]
struct Extraction {
    column: String,
    expression: String,
    op: ColumnExpression,
}

impl Extraction {
    fn output_name(&self) -> String {
        format!("{}{}", self.column, self.expression)
    }
}

/// Copies selected columns, optionally rescaled, into
/// `<dataset>/<output_folder>/<stem>_extracted.txt`
#[derive(Debug)]
pub struct ExtractColumns {
    init: TransformerInit,
    extractions: Vec<Extraction>,
    output_folder: String,
    data: Option<Table>,
    result: Option<Table>,
}

impl ExtractColumns {
    /// Build from init data with bound parameters
    ///
    /// # Errors
    /// Returns [`PluginError::InvalidParam`] for a missing column name,
    /// an unparsable expression or no `output_folder`
    pub fn new(init: TransformerInit) -> PluginResult<Self> {
        let extractions = init
            .params
            .groups(COLUMNS)
            .iter()
            .map(parse_extraction)
            .collect::<PluginResult<Vec<_>>>()?;
        let output_folder = init
            .params
            .text(OUTPUT_FOLDER)
            .ok_or_else(|| PluginError::invalid_param(OUTPUT_FOLDER, "is required"))?
            .to_string();
        Ok(Self {
            init,
            extractions,
            output_folder,
            data: None,
            result: None,
        })
    }
}

fn parse_extraction(entry: &ValueTree) -> PluginResult<Extraction> {
    let column = entry
        .text("colname")
        .filter(|c| !c.is_empty())
        .ok_or_else(|| PluginError::invalid_param("colname", "is required"))?;
    let expression = entry.text("expression").unwrap_or_default().trim();
    Ok(Extraction {
        column: column.to_string(),
        expression: expression.to_string(),
        op: ColumnExpression::parse(expression)?,
    })
}

impl Transformer for ExtractColumns {
    fn load(&mut self) -> PluginResult<()> {
        self.data = Some(self.init.load_table()?);
        Ok(())
    }

    fn process(&mut self) -> PluginResult<()> {
        debug!(input = %self.init.input.display(), "extracting columns");
        let data = self.data.as_ref().ok_or(PluginError::NoData)?;
        let mut result = Table::new();
        for extraction in &self.extractions {
            let source = data.require(&extraction.column)?;
            let values = source.iter().map(|&x| extraction.op.eval(x)).collect();
            result.insert_column(extraction.output_name(), values)?;
        }
        self.result = Some(result);
        Ok(())
    }

    fn persist(&mut self) -> PluginResult<Vec<PathBuf>> {
        let result = self.result.as_ref().ok_or(PluginError::NoData)?;
        let file_name = format!("{}_extracted.txt", self.init.input_stem()?);
        let path = self
            .init
            .persist_table(result, &file_name, Some(&self.output_folder))?;
        info!(path = %path.display(), "saved extracted columns");
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use datalab_plugin::JsonTableStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_operator_expressions() {
        assert_eq!(ColumnExpression::parse("").unwrap(), ColumnExpression::Identity);
        assert_eq!(ColumnExpression::parse("*1e3").unwrap(), ColumnExpression::Mul(1000.0));
        assert_eq!(ColumnExpression::parse(" - 0.5 ").unwrap(), ColumnExpression::Sub(0.5));
        assert_eq!(ColumnExpression::parse("/-2").unwrap(), ColumnExpression::Div(-2.0));
        assert!(ColumnExpression::parse("x**2").is_err());
        assert!(ColumnExpression::parse("*").is_err());
    }

    #[test]
    fn extracts_and_names_columns() {
        let params = ValueTree::new()
            .with(
                COLUMNS,
                vec![
                    ValueTree::new().with("colname", "V").with("expression", "*2"),
                    ValueTree::new().with("colname", "t"),
                ],
            )
            .with(OUTPUT_FOLDER, "out");
        let data = Table::from_columns([("t", vec![0.0, 1.0]), ("V", vec![1.5, 2.5])]).unwrap();
        let init = TransformerInit::new("raw/cd/run.dat", "/unused", params, Arc::new(JsonTableStore))
            .with_data(data);

        let mut extract = ExtractColumns::new(init).unwrap();
        extract.load().unwrap();
        extract.process().unwrap();

        let result = extract.result.unwrap();
        assert_eq!(result.column_names(), vec!["V*2".to_string(), "t".to_string()]);
        assert_eq!(result.column("V*2"), Some(&[3.0, 5.0][..]));
    }

    #[test]
    fn unknown_column_fails_in_process() {
        let params = ValueTree::new()
            .with(COLUMNS, vec![ValueTree::new().with("colname", "I")])
            .with(OUTPUT_FOLDER, "out");
        let data = Table::from_columns([("V", vec![1.0])]).unwrap();
        let init = TransformerInit::new("run.dat", "/unused", params, Arc::new(JsonTableStore)).with_data(data);

        let mut extract = ExtractColumns::new(init).unwrap();
        extract.load().unwrap();
        assert!(matches!(extract.process(), Err(PluginError::MissingColumn(c)) if c == "I"));
    }
}
