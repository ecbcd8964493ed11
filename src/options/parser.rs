//! Reading an options file into a [`ParameterStore`](super::ParameterStore).
//!
//! Unknown and repeated parameters are warnings; malformed lines and values
//! that do not coerce to their schema type abort the read.

use std::path::Path;

use log::{debug, warn};

use super::error::{ConfigError, ConfigWarning};
use super::literal::parse_literal;
use super::normalize::{candidate_lines, strip_inline_comment, CandidateLine};
use super::schema::{self, TypeTag};
use super::value::{OptionValue, ParameterStore};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// File read when the caller does not name one.
pub const DEFAULT_OPTIONS_FILE: &str = "pipeline.options";

/// Tokens accepted as `true` for boolean parameters (compared
/// case-insensitively). Everything else is `false`.
const TRUTHY: &[&str] = &["true", "yes"];

/// Result of a successful parse: the validated store plus every non-fatal
/// diagnostic, in source order.
#[derive(Debug, Clone, Default)]
pub struct ParsedOptions {
    pub store: ParameterStore,
    pub warnings: Vec<ConfigWarning>,
}

/// Read and parse an options file.
pub fn read_pipeline_options(path: &Path) -> Result<ParsedOptions, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_options(&text)?;
    debug!(
        "Read {} parameters from {} ({} warnings)",
        parsed.store.len(),
        path.display(),
        parsed.warnings.len()
    );
    Ok(parsed)
}

/// Parse options text. Stops at the first fatal error.
pub fn parse_options(text: &str) -> Result<ParsedOptions, ConfigError> {
    let mut parsed = ParsedOptions::default();
    for line in candidate_lines(text) {
        if let Some(warning) = parse_line(&mut parsed.store, line)? {
            warn!("{warning}");
            parsed.warnings.push(warning);
        }
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Per-line parsing
// ---------------------------------------------------------------------------

/// Apply one candidate line to `store`.
///
/// Returns `Ok(Some(_))` when the line was skipped for a recoverable reason
/// (unknown or duplicate parameter), `Ok(None)` when a value was inserted.
pub fn parse_line(
    store: &mut ParameterStore,
    line: CandidateLine<'_>,
) -> Result<Option<ConfigWarning>, ConfigError> {
    let malformed = || ConfigError::MalformedLine {
        line_number: line.number,
        line: line.text.to_string(),
    };

    let (key, raw_value) = line.text.split_once('=').ok_or_else(malformed)?;
    let value = strip_inline_comment(raw_value);

    let (module, parameter) = key.trim().split_once('.').ok_or_else(malformed)?;
    let (module, parameter) = (module.trim(), parameter.trim());
    if module.is_empty() || parameter.is_empty() {
        return Err(malformed());
    }

    let Some(tag) = schema::lookup(module, parameter) else {
        return Ok(Some(ConfigWarning::UnknownParameter {
            line_number: line.number,
            module: module.to_string(),
            parameter: parameter.to_string(),
            value: value.to_string(),
        }));
    };

    if store.contains(module, parameter) {
        return Ok(Some(ConfigWarning::DuplicateParameter {
            line_number: line.number,
            module: module.to_string(),
            parameter: parameter.to_string(),
        }));
    }

    let coerced = coerce(value, tag).map_err(|reason| ConfigError::InvalidValue {
        line_number: line.number,
        line: line.text.to_string(),
        expected: tag,
        reason,
    })?;
    store.insert(module, parameter, coerced);
    Ok(None)
}

/// Permissive boolean parse: unrecognised tokens are `false`, never an error.
pub fn str_to_bool(value: &str) -> bool {
    let value = value.trim();
    TRUTHY.iter().any(|t| value.eq_ignore_ascii_case(t))
}

/// Convert a raw value string into the declared type.
fn coerce(value: &str, tag: TypeTag) -> Result<OptionValue, String> {
    match tag {
        TypeTag::Bool => Ok(OptionValue::Bool(str_to_bool(value))),
        TypeTag::Int => value
            .parse::<i64>()
            .map(OptionValue::Int)
            .map_err(|e| format!("'{value}': {e}")),
        TypeTag::Float => value
            .parse::<f64>()
            .map(OptionValue::Float)
            .map_err(|e| format!("'{value}': {e}")),
        TypeTag::String => Ok(OptionValue::Text(value.to_string())),
        TypeTag::Array => match parse_literal(value).map_err(|e| e.to_string())? {
            seq @ OptionValue::Sequence(_) => Ok(seq),
            scalar => Ok(OptionValue::Sequence(vec![scalar])),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedOptions {
        parse_options(text).unwrap()
    }

    #[test]
    fn test_every_type_coerces() {
        let parsed = parse(
            "steps.doThreshold = true\n\
             merge.radiusX = 3\n\
             threshold.threshold = 4.5\n\
             threshold.clipMethod = relative\n\
             flag.regions = [[0, 10, 0, 10, 5, 7]]\n",
        );
        let s = &parsed.store;
        assert!(parsed.warnings.is_empty());
        assert_eq!(s.get("steps", "doThreshold"), Some(&OptionValue::Bool(true)));
        assert_eq!(s.get("merge", "radiusX"), Some(&OptionValue::Int(3)));
        assert_eq!(s.get("threshold", "threshold"), Some(&OptionValue::Float(4.5)));
        assert_eq!(
            s.get("threshold", "clipMethod"),
            Some(&OptionValue::Text("relative".into()))
        );
        let regions = s.get("flag", "regions").unwrap().as_sequence().unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].as_sequence().unwrap().len(), 6);
    }

    #[test]
    fn test_float_accepts_integer_literal() {
        let parsed = parse("threshold.threshold = 4");
        assert_eq!(
            parsed.store.get("threshold", "threshold"),
            Some(&OptionValue::Float(4.0))
        );
    }

    #[test]
    fn test_stored_types_match_schema() {
        let parsed = parse(
            "import.subcube = 5\n\
             writeCat.basename = out\n\
             CNHI.verbose = 2\n\
             reliability.fMin = 1e3\n",
        );
        for module in parsed.store.modules() {
            for (name, value) in module.iter() {
                assert_eq!(
                    Some(value.type_tag()),
                    schema::lookup(module.name(), name),
                    "{}.{name}",
                    module.name()
                );
            }
        }
        // Scalar array literals become one-element sequences.
        assert_eq!(
            parsed.store.get("import", "subcube"),
            Some(&OptionValue::Sequence(vec![OptionValue::Int(5)]))
        );
    }

    #[test]
    fn test_duplicate_first_wins() {
        let parsed = parse("merge.radiusX = 1\nmerge.radiusY = 4\nmerge.radiusX = 2\n");
        assert_eq!(parsed.store.get("merge", "radiusX"), Some(&OptionValue::Int(1)));
        assert_eq!(
            parsed.warnings,
            vec![ConfigWarning::DuplicateParameter {
                line_number: 3,
                module: "merge".into(),
                parameter: "radiusX".into(),
            }]
        );
    }

    #[test]
    fn test_duplicate_with_bad_value_is_not_fatal() {
        // The duplicate is skipped before its value is looked at.
        let parsed = parse("merge.radiusX = 1\nmerge.radiusX = lots\n");
        assert_eq!(parsed.store.get("merge", "radiusX"), Some(&OptionValue::Int(1)));
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_unknown_parameter_skipped() {
        let parsed = parse("x.y = 5\nsteps.doFlag = yes\n");
        assert!(parsed.store.module("x").is_none());
        assert_eq!(parsed.store.len(), 1);
        assert!(matches!(
            &parsed.warnings[..],
            [ConfigWarning::UnknownParameter { line_number: 1, module, parameter, .. }]
                if module == "x" && parameter == "y"
        ));
    }

    #[test]
    fn test_unknown_with_bad_value_is_not_fatal() {
        let parsed = parse("threshold.sigma = not-a-number");
        assert!(parsed.store.is_empty());
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_malformed_lines_are_fatal() {
        for bad in ["novaluehere", "=5", "bareword = 5", ".threshold = 5", "threshold. = 5"] {
            let err = parse_options(bad).unwrap_err();
            assert!(
                matches!(err, ConfigError::MalformedLine { line_number: 1, .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_malformed_aborts_whole_parse() {
        let err = parse_options("steps.doFlag = true\n\n# comment\noops\nmerge.radiusX = 1").unwrap_err();
        match err {
            ConfigError::MalformedLine { line_number, line } => {
                assert_eq!(line_number, 4);
                assert_eq!(line, "oops");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_values_are_fatal() {
        for (bad, expected) in [
            ("merge.radiusX = 1.5", TypeTag::Int),
            ("merge.radiusX = ", TypeTag::Int),
            ("threshold.threshold = four", TypeTag::Float),
            ("flag.regions = [1, 2", TypeTag::Array),
        ] {
            match parse_options(bad).unwrap_err() {
                ConfigError::InvalidValue { expected: e, .. } => assert_eq!(e, expected),
                other => panic!("{bad:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_value_message_names_type() {
        let err = parse_options("threshold.threshold = four").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("threshold.threshold = four"));
        assert!(msg.contains("Expected data type: float"));
    }

    #[test]
    fn test_boolean_coercion() {
        for t in ["True", "true", "yes", "YES", "Yes", "TRUE"] {
            assert!(str_to_bool(t), "{t}");
        }
        for f in ["maybe", "1", "False", "no", "", "on"] {
            assert!(!str_to_bool(f), "{f}");
        }
        let parsed = parse("steps.doFlag = maybe\nsteps.doMerge = YES # on");
        assert_eq!(parsed.store.get("steps", "doFlag"), Some(&OptionValue::Bool(false)));
        assert_eq!(parsed.store.get("steps", "doMerge"), Some(&OptionValue::Bool(true)));
    }

    #[test]
    fn test_inline_comments_and_whitespace() {
        let parsed = parse("  threshold.rmsMode   =   mad    # robust\n\tthreshold . threshold = 3 ");
        assert_eq!(
            parsed.store.get("threshold", "rmsMode"),
            Some(&OptionValue::Text("mad".into()))
        );
        assert_eq!(
            parsed.store.get("threshold", "threshold"),
            Some(&OptionValue::Float(3.0))
        );
    }

    #[test]
    fn test_value_may_contain_equals() {
        let parsed = parse("import.inFile = data/a=b.json");
        assert_eq!(
            parsed.store.get("import", "inFile"),
            Some(&OptionValue::Text("data/a=b.json".into()))
        );
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_pipeline_options(Path::new("/nonexistent/pipeline.options")).unwrap_err();
        assert!(matches!(err, ConfigError::FileUnreadable { .. }));
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OPTIONS_FILE);
        std::fs::write(&path, "# pipeline\nsteps.doThreshold = true\nthreshold.threshold = 4.0\n").unwrap();
        let parsed = read_pipeline_options(&path).unwrap();
        assert_eq!(parsed.store.len(), 2);
    }
}
