//! Unit converter for length, mass, temperature and volume.

use crate::config::{Constraints, OptionSpec};
use crate::error::{ToolError, ValidationError};
use crate::request::{Parameters, ToolRequest};
use crate::result::Artifact;
use crate::tool::Tool;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub const NAME: &str = "unit-converter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Length,
    Mass,
    Temperature,
    Volume,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Length => "length",
            Category::Mass => "mass",
            Category::Temperature => "temperature",
            Category::Volume => "volume",
        })
    }
}

/// A unit: symbol, category and the factor to the category's base unit
/// (metre, kilogram, litre). Temperature converts through kelvin instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub symbol: &'static str,
    pub category: Category,
    factor: f64,
}

const fn unit(symbol: &'static str, category: Category, factor: f64) -> Unit {
    Unit {
        symbol,
        category,
        factor,
    }
}

pub const UNITS: &[Unit] = &[
    unit("m", Category::Length, 1.0),
    unit("km", Category::Length, 1000.0),
    unit("cm", Category::Length, 0.01),
    unit("mm", Category::Length, 0.001),
    unit("mi", Category::Length, 1609.344),
    unit("yd", Category::Length, 0.9144),
    unit("ft", Category::Length, 0.3048),
    unit("in", Category::Length, 0.0254),
    unit("kg", Category::Mass, 1.0),
    unit("g", Category::Mass, 0.001),
    unit("mg", Category::Mass, 0.000_001),
    unit("lb", Category::Mass, 0.453_592_37),
    unit("oz", Category::Mass, 0.028_349_523_125),
    unit("c", Category::Temperature, 1.0),
    unit("f", Category::Temperature, 1.0),
    unit("k", Category::Temperature, 1.0),
    unit("l", Category::Volume, 1.0),
    unit("ml", Category::Volume, 0.001),
    unit("gal", Category::Volume, 3.785_411_784),
    unit("qt", Category::Volume, 0.946_352_946),
    unit("pt", Category::Volume, 0.473_176_473),
    unit("cup", Category::Volume, 0.236_588_236_5),
    unit("floz", Category::Volume, 0.029_573_529_562_5),
];

pub fn find_unit(symbol: &str) -> Option<&'static Unit> {
    UNITS.iter().find(|u| u.symbol.eq_ignore_ascii_case(symbol))
}

fn to_kelvin(value: f64, symbol: &str) -> f64 {
    match symbol {
        "c" => value + 273.15,
        "f" => (value - 32.0) * 5.0 / 9.0 + 273.15,
        _ => value,
    }
}

fn from_kelvin(value: f64, symbol: &str) -> f64 {
    match symbol {
        "c" => value - 273.15,
        "f" => (value - 273.15) * 9.0 / 5.0 + 32.0,
        _ => value,
    }
}

/// Convert `value` between two units of the same category.
pub fn convert(value: f64, from: &Unit, to: &Unit) -> Result<f64, ValidationError> {
    if from.category != to.category {
        return Err(ValidationError::invalid_parameter(
            "to",
            format!(
                "cannot convert {} ({}) to {} ({})",
                from.symbol, from.category, to.symbol, to.category
            ),
        ));
    }
    let out = if from.category == Category::Temperature {
        from_kelvin(to_kelvin(value, from.symbol), to.symbol)
    } else {
        value * from.factor / to.factor
    };
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub value: f64,
    pub from: &'static str,
    pub result: f64,
    pub to: &'static str,
    pub category: Category,
}

/// Up to six decimals, trailing zeros trimmed.
fn pretty(v: f64) -> String {
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

impl Artifact for Conversion {
    fn summary(&self) -> Vec<String> {
        vec![format!(
            "{} {} = {} {}",
            pretty(self.value),
            self.from,
            pretty(self.result),
            self.to
        )]
    }
}

fn parse_value(raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::invalid_input(format!("'{}' is not a number", raw.trim())))
}

fn units_of(params: &Parameters) -> Result<(&'static Unit, &'static Unit), ValidationError> {
    let lookup = |name: &str| -> Result<&'static Unit, ValidationError> {
        let symbol = params.require(name)?;
        find_unit(symbol)
            .ok_or_else(|| ValidationError::invalid_parameter(name, format!("unknown unit '{symbol}'")))
    };
    Ok((lookup("from")?, lookup("to")?))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnitConverterTool;

impl UnitConverterTool {
    fn compute(request: &ToolRequest) -> Result<Conversion, ValidationError> {
        let value = parse_value(request.payload.as_text().unwrap_or_default())?;
        let (from, to) = units_of(&request.parameters)?;
        let result = convert(value, from, to)?;
        Ok(Conversion {
            value,
            from: from.symbol,
            result,
            to: to.symbol,
            category: from.category,
        })
    }
}

#[async_trait]
impl Tool for UnitConverterTool {
    type Output = Conversion;

    fn name(&self) -> &'static str {
        NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("a number", 64)
    }

    fn options(&self) -> Vec<OptionSpec> {
        let symbols: Vec<&str> = UNITS.iter().map(|u| u.symbol).collect();
        vec![
            OptionSpec::choice("from", &symbols, "m").without_default(),
            OptionSpec::choice("to", &symbols, "m").without_default(),
        ]
    }

    fn validate(&self, request: &ToolRequest) -> Result<(), ValidationError> {
        Self::compute(request).map(|_| ())
    }

    async fn process(&self, request: &ToolRequest) -> Result<Conversion, ToolError> {
        Ok(Self::compute(request)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::controller::ToolPipeline;
    use crate::request::RawInput;

    fn conv(v: f64, from: &str, to: &str) -> f64 {
        convert(v, find_unit(from).unwrap(), find_unit(to).unwrap()).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn length_mass_volume() {
        assert!(close(conv(1.0, "mi", "km"), 1.609344));
        assert!(close(conv(12.0, "in", "ft"), 1.0));
        assert!(close(conv(1.0, "lb", "oz"), 16.0));
        assert!(close(conv(1.0, "gal", "qt"), 4.0));
        assert!(close(conv(1.0, "cup", "floz"), 8.0));
    }

    #[test]
    fn temperature_is_affine() {
        assert!(close(conv(100.0, "c", "f"), 212.0));
        assert!(close(conv(-40.0, "f", "c"), -40.0));
        assert!(close(conv(0.0, "k", "c"), -273.15));
    }

    #[test]
    fn cross_category_is_rejected() {
        let err = convert(1.0, find_unit("kg").unwrap(), find_unit("m").unwrap()).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameterError");
    }

    #[test]
    fn summary_trims_trailing_zeros() {
        let c = Conversion {
            value: 5.0,
            from: "km",
            result: 5000.0,
            to: "m",
            category: Category::Length,
        };
        assert_eq!(c.summary()[0], "5 km = 5000 m");
    }

    #[tokio::test]
    async fn pipeline_validates_value_and_units() {
        let p = ToolPipeline::new(UnitConverterTool, PipelineConfig::default());

        let err = p
            .acquire(
                RawInput::text("ten"),
                Parameters::new().with("from", "m").with("to", "ft"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Validation(ValidationError::InvalidInput { .. })
        ));

        let err = p
            .acquire(RawInput::text("10"), Parameters::new().with("from", "m"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Validation(ValidationError::InvalidParameter { .. })
        ));

        let r = p
            .run(
                RawInput::text("3"),
                Parameters::new().with("from", "FT").with("to", "in"),
            )
            .await
            .unwrap();
        assert!(close(r.artifact().unwrap().result, 36.0));
    }
}
