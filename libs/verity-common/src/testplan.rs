//! Expected outputs of a testcase, one channel at a time, and the evaluator
//! descriptors attached to them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::value::{ExceptionValue, Value};

/// Free-form evaluator options, validated by the evaluator that consumes them.
pub type Options = Map<String, Json>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    None,
    Ignored,
}

/// A channel is either a sentinel (`"none"` / `"ignored"`) or a declared
/// expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Output<T> {
    State(ChannelState),
    Declared(T),
}

impl<T> Output<T> {
    pub fn none() -> Self {
        Output::State(ChannelState::None)
    }

    pub fn ignored() -> Self {
        Output::State(ChannelState::Ignored)
    }
}

impl<T: AsChannel> Output<T> {
    pub fn as_channel(&self) -> Channel<'_> {
        match self {
            Output::State(ChannelState::None) => Channel::None,
            Output::State(ChannelState::Ignored) => Channel::Ignored,
            Output::Declared(channel) => channel.as_channel(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextData {
    #[default]
    Text,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOutputChannel {
    pub data: String,
    #[serde(default, rename = "type")]
    pub kind: TextData,
    #[serde(default = "EvaluatorDescriptor::text")]
    pub evaluator: EvaluatorDescriptor,
}

impl TextOutputChannel {
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            kind: TextData::Text,
            evaluator: EvaluatorDescriptor::text(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: EvaluatorDescriptor) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Expected text: the inline data, or the contents of the file it names
    /// under `resources`.
    pub fn data_as_string(&self, resources: &Path) -> io::Result<String> {
        match self.kind {
            TextData::Text => Ok(self.data.clone()),
            TextData::File => std::fs::read_to_string(resolve_path(resources, &self.data)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutputChannel {
    pub expected_path: String,
    pub actual_path: String,
    #[serde(default = "EvaluatorDescriptor::file")]
    pub evaluator: EvaluatorDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueOutputChannel {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default = "EvaluatorDescriptor::value")]
    pub evaluator: EvaluatorDescriptor,
}

impl ValueOutputChannel {
    pub fn new(value: Value) -> Self {
        Self {
            value: Some(value),
            evaluator: EvaluatorDescriptor::value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionOutputChannel {
    #[serde(default)]
    pub exception: Option<ExceptionValue>,
    #[serde(default = "EvaluatorDescriptor::exception")]
    pub evaluator: EvaluatorDescriptor,
}

impl ExceptionOutputChannel {
    pub fn new(exception: ExceptionValue) -> Self {
        Self {
            exception: Some(exception),
            evaluator: EvaluatorDescriptor::exception(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCodeOutputChannel {
    #[serde(default)]
    pub value: i32,
}

/// Borrowed view of one channel, handed to evaluators.
#[derive(Debug, Clone, Copy)]
pub enum Channel<'a> {
    None,
    Ignored,
    Text(&'a TextOutputChannel),
    File(&'a FileOutputChannel),
    Value(&'a ValueOutputChannel),
    Exception(&'a ExceptionOutputChannel),
}

impl<'a> Channel<'a> {
    /// The attached evaluator descriptor; sentinels have none.
    pub fn evaluator(&self) -> Option<&'a EvaluatorDescriptor> {
        match self {
            Channel::None | Channel::Ignored => None,
            Channel::Text(channel) => Some(&channel.evaluator),
            Channel::File(channel) => Some(&channel.evaluator),
            Channel::Value(channel) => Some(&channel.evaluator),
            Channel::Exception(channel) => Some(&channel.evaluator),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Channel::None => "none",
            Channel::Ignored => "ignored",
            Channel::Text(_) => "text",
            Channel::File(_) => "file",
            Channel::Value(_) => "value",
            Channel::Exception(_) => "exception",
        }
    }
}

pub trait AsChannel {
    fn as_channel(&self) -> Channel<'_>;
}

impl AsChannel for TextOutputChannel {
    fn as_channel(&self) -> Channel<'_> {
        Channel::Text(self)
    }
}

impl AsChannel for FileOutputChannel {
    fn as_channel(&self) -> Channel<'_> {
        Channel::File(self)
    }
}

impl AsChannel for ValueOutputChannel {
    fn as_channel(&self) -> Channel<'_> {
        Channel::Value(self)
    }
}

impl AsChannel for ExceptionOutputChannel {
    fn as_channel(&self) -> Channel<'_> {
        Channel::Exception(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestcaseOutput {
    #[serde(default = "Output::none")]
    pub stdout: Output<TextOutputChannel>,
    #[serde(default = "Output::none")]
    pub stderr: Output<TextOutputChannel>,
    #[serde(default = "Output::ignored")]
    pub file: Output<FileOutputChannel>,
    #[serde(default = "Output::none")]
    pub exception: Output<ExceptionOutputChannel>,
    #[serde(default = "Output::none")]
    pub result: Output<ValueOutputChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<ExitCodeOutputChannel>,
}

impl Default for TestcaseOutput {
    fn default() -> Self {
        Self {
            stdout: Output::none(),
            stderr: Output::none(),
            file: Output::ignored(),
            exception: Output::none(),
            result: Output::none(),
            exit_code: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBuiltin {
    Text,
    File,
    Exception,
}

impl TextBuiltin {
    pub fn name(self) -> &'static str {
        match self {
            TextBuiltin::Text => "text",
            TextBuiltin::File => "file",
            TextBuiltin::Exception => "exception",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEvaluatorDescriptor {
    pub language: String,
    pub path: PathBuf,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

fn default_function_name() -> String {
    "evaluate".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationFunction {
    pub file: PathBuf,
    #[serde(default = "default_function_name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificEvaluatorDescriptor {
    pub evaluators: BTreeMap<String, EvaluationFunction>,
}

/// Which evaluator handles a channel, and its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor", into = "RawDescriptor")]
pub enum EvaluatorDescriptor {
    TextBuiltin { name: TextBuiltin, options: Options },
    ValueBuiltin { options: Options },
    ExceptionBuiltin { options: Options },
    Custom(CustomEvaluatorDescriptor),
    Specific(SpecificEvaluatorDescriptor),
}

impl EvaluatorDescriptor {
    pub fn text() -> Self {
        EvaluatorDescriptor::TextBuiltin {
            name: TextBuiltin::Text,
            options: Options::new(),
        }
    }

    pub fn file() -> Self {
        EvaluatorDescriptor::TextBuiltin {
            name: TextBuiltin::File,
            options: Options::new(),
        }
    }

    pub fn exception() -> Self {
        EvaluatorDescriptor::TextBuiltin {
            name: TextBuiltin::Exception,
            options: Options::new(),
        }
    }

    pub fn value() -> Self {
        EvaluatorDescriptor::ValueBuiltin { options: Options::new() }
    }
}

#[derive(Serialize, Deserialize)]
struct RawDescriptor {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    family: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    options: Options,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    evaluators: Option<BTreeMap<String, EvaluationFunction>>,
}

impl RawDescriptor {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: None,
            family: None,
            options: Options::new(),
            language: None,
            path: None,
            arguments: Vec::new(),
            evaluators: None,
        }
    }
}

impl TryFrom<RawDescriptor> for EvaluatorDescriptor {
    type Error = String;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "builtin" => {
                let options = raw.options;
                match (raw.family.as_deref(), raw.name.as_deref()) {
                    (Some("exception"), None | Some("exception")) => {
                        Ok(EvaluatorDescriptor::ExceptionBuiltin { options })
                    }
                    (Some("value"), None | Some("value")) | (None, Some("value")) => {
                        Ok(EvaluatorDescriptor::ValueBuiltin { options })
                    }
                    (None | Some("text"), None | Some("text")) => Ok(EvaluatorDescriptor::TextBuiltin {
                        name: TextBuiltin::Text,
                        options,
                    }),
                    (None | Some("text"), Some("file")) => Ok(EvaluatorDescriptor::TextBuiltin {
                        name: TextBuiltin::File,
                        options,
                    }),
                    (None | Some("text"), Some("exception")) => Ok(EvaluatorDescriptor::TextBuiltin {
                        name: TextBuiltin::Exception,
                        options,
                    }),
                    (family, name) => Err(format!(
                        "unknown built-in evaluator (family: {}, name: {})",
                        family.unwrap_or("-"),
                        name.unwrap_or("-")
                    )),
                }
            }
            "custom" | "programmed" => {
                let language = raw
                    .language
                    .ok_or_else(|| "custom evaluator without a \"language\"".to_string())?;
                let path = raw
                    .path
                    .ok_or_else(|| "custom evaluator without a \"path\"".to_string())?;
                Ok(EvaluatorDescriptor::Custom(CustomEvaluatorDescriptor {
                    language,
                    path,
                    arguments: raw.arguments,
                }))
            }
            "specific" => match raw.evaluators {
                Some(evaluators) if !evaluators.is_empty() => {
                    Ok(EvaluatorDescriptor::Specific(SpecificEvaluatorDescriptor { evaluators }))
                }
                _ => Err("specific evaluator needs at least one language entry".to_string()),
            },
            other => Err(format!("unknown evaluator type '{other}'")),
        }
    }
}

impl From<EvaluatorDescriptor> for RawDescriptor {
    fn from(descriptor: EvaluatorDescriptor) -> Self {
        match descriptor {
            EvaluatorDescriptor::TextBuiltin { name, options } => RawDescriptor {
                name: Some(name.name().to_string()),
                options,
                ..RawDescriptor::new("builtin")
            },
            EvaluatorDescriptor::ValueBuiltin { options } => RawDescriptor {
                name: Some("value".to_string()),
                options,
                ..RawDescriptor::new("builtin")
            },
            EvaluatorDescriptor::ExceptionBuiltin { options } => RawDescriptor {
                family: Some("exception".to_string()),
                options,
                ..RawDescriptor::new("builtin")
            },
            EvaluatorDescriptor::Custom(custom) => RawDescriptor {
                language: Some(custom.language),
                path: Some(custom.path),
                arguments: custom.arguments,
                ..RawDescriptor::new("custom")
            },
            EvaluatorDescriptor::Specific(specific) => RawDescriptor {
                evaluators: Some(specific.evaluators),
                ..RawDescriptor::new("specific")
            },
        }
    }
}

/// Joins a relative path onto `base`; absolute paths are kept as they are.
pub fn resolve_path(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let output: TestcaseOutput = serde_json::from_str(r#"{"stdout": "ignored"}"#).unwrap();
        assert!(matches!(output.stdout.as_channel(), Channel::Ignored));
        assert!(matches!(output.stderr.as_channel(), Channel::None));
        assert!(matches!(output.file.as_channel(), Channel::Ignored));
        assert!(output.exit_code.is_none());
    }

    #[test]
    fn test_text_channel_defaults_to_text_evaluator() {
        let output: TestcaseOutput = serde_json::from_str(r#"{"stdout": {"data": "hello"}}"#).unwrap();
        let Channel::Text(channel) = output.stdout.as_channel() else {
            panic!("expected a text channel");
        };
        assert_eq!(channel.data, "hello");
        assert_eq!(channel.kind, TextData::Text);
        assert_eq!(channel.evaluator, EvaluatorDescriptor::text());
    }

    #[test]
    fn test_descriptor_tags() {
        let parse = |raw: &str| serde_json::from_str::<EvaluatorDescriptor>(raw);

        assert!(matches!(
            parse(r#"{"type": "builtin", "name": "file", "options": {"mode": "lines"}}"#).unwrap(),
            EvaluatorDescriptor::TextBuiltin { name: TextBuiltin::File, options } if options["mode"] == "lines"
        ));
        assert!(matches!(
            parse(r#"{"type": "builtin", "name": "value"}"#).unwrap(),
            EvaluatorDescriptor::ValueBuiltin { .. }
        ));
        assert!(matches!(
            parse(r#"{"type": "builtin", "family": "exception"}"#).unwrap(),
            EvaluatorDescriptor::ExceptionBuiltin { .. }
        ));
        assert!(matches!(
            parse(r#"{"type": "programmed", "language": "python", "path": "judge.py"}"#).unwrap(),
            EvaluatorDescriptor::Custom(custom) if custom.language == "python" && custom.arguments.is_empty()
        ));

        let specific = parse(r#"{"type": "specific", "evaluators": {"python": {"file": "eval.py"}}}"#).unwrap();
        let EvaluatorDescriptor::Specific(specific) = specific else {
            panic!("expected a specific descriptor");
        };
        assert_eq!(specific.evaluators["python"].name, "evaluate");
    }

    #[test]
    fn test_descriptor_rejects_unknown_combinations() {
        let parse = |raw: &str| serde_json::from_str::<EvaluatorDescriptor>(raw);
        assert!(parse(r#"{"type": "builtin", "name": "fuzzy"}"#).is_err());
        assert!(parse(r#"{"type": "oracle"}"#).is_err());
        assert!(parse(r#"{"type": "custom", "path": "judge.py"}"#).is_err());
        assert!(parse(r#"{"type": "specific", "evaluators": {}}"#).is_err());
    }

    #[test]
    fn test_descriptor_serializes_to_its_tags() {
        let json = serde_json::to_value(EvaluatorDescriptor::file()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "builtin", "name": "file"}));
    }

    #[test]
    fn test_data_as_string_reads_resource_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("expected.txt"), "from file").unwrap();

        let channel = TextOutputChannel {
            data: "expected.txt".to_string(),
            kind: TextData::File,
            evaluator: EvaluatorDescriptor::text(),
        };
        assert_eq!(channel.data_as_string(dir.path()).unwrap(), "from file");
        assert_eq!(TextOutputChannel::text("inline").data_as_string(dir.path()).unwrap(), "inline");

        let missing = TextOutputChannel {
            data: "missing.txt".to_string(),
            ..channel
        };
        assert!(missing.data_as_string(dir.path()).is_err());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path(Path::new("/res"), "a.txt"), PathBuf::from("/res/a.txt"));
        assert_eq!(resolve_path(Path::new("/res"), "/abs/a.txt"), PathBuf::from("/abs/a.txt"));
    }
}
