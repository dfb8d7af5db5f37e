use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::testplan::TestcaseOutput;
use crate::value::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "correct")]
    Correct,
    #[serde(rename = "wrong")]
    Wrong,
    #[serde(rename = "runtime error")]
    RuntimeError,
    #[serde(rename = "internal error")]
    InternalError,
    #[serde(rename = "compilation error")]
    CompilationError,
    #[serde(rename = "time limit exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "memory limit exceeded")]
    MemoryLimitExceeded,
    #[serde(rename = "output limit exceeded")]
    OutputLimitExceeded,
}

impl Status {
    /// Higher is worse.
    pub fn severity(self) -> u8 {
        match self {
            Status::Correct => 0,
            Status::Wrong => 1,
            Status::RuntimeError => 2,
            Status::OutputLimitExceeded => 3,
            Status::TimeLimitExceeded => 4,
            Status::MemoryLimitExceeded => 5,
            Status::CompilationError => 6,
            Status::InternalError => 7,
        }
    }

    pub fn worst(self, other: Status) -> Status {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Correct => "correct",
            Status::Wrong => "wrong",
            Status::RuntimeError => "runtime error",
            Status::InternalError => "internal error",
            Status::CompilationError => "compilation error",
            Status::TimeLimitExceeded => "time limit exceeded",
            Status::MemoryLimitExceeded => "memory limit exceeded",
            Status::OutputLimitExceeded => "output limit exceeded",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(rename = "enum")]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human: Option<String>,
}

impl StatusMessage {
    pub fn new(status: Status) -> Self {
        Self { status, human: None }
    }
}

/// Who gets to see a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Student,
    Staff,
    Zeus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MessageRepr")]
pub struct Message {
    pub description: String,
    pub format: String,
    pub permission: Permission,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageRepr {
    Plain(String),
    Extended {
        description: String,
        #[serde(default = "default_format")]
        format: String,
        #[serde(default)]
        permission: Permission,
    },
}

fn default_format() -> String {
    "text".to_string()
}

impl From<MessageRepr> for Message {
    fn from(repr: MessageRepr) -> Self {
        match repr {
            MessageRepr::Plain(description) => Message::text(description),
            MessageRepr::Extended {
                description,
                format,
                permission,
            } => Message {
                description,
                format,
                permission,
            },
        }
    }
}

impl Message {
    pub fn text(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            format: default_format(),
            permission: Permission::Student,
        }
    }

    pub fn staff(description: impl Into<String>) -> Self {
        Self {
            permission: Permission::Staff,
            ..Self::text(description)
        }
    }
}

/// Outcome of evaluating one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub result: StatusMessage,
    pub readable_expected: String,
    pub readable_actual: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl EvaluationResult {
    pub fn new(status: Status, readable_expected: impl Into<String>, readable_actual: impl Into<String>) -> Self {
        Self {
            result: StatusMessage::new(status),
            readable_expected: readable_expected.into(),
            readable_actual: readable_actual.into(),
            messages: Vec::new(),
        }
    }

    pub fn verdict(correct: bool, readable_expected: impl Into<String>, readable_actual: impl Into<String>) -> Self {
        let status = if correct { Status::Correct } else { Status::Wrong };
        Self::new(status, readable_expected, readable_actual)
    }

    pub fn with_human(mut self, human: impl Into<String>) -> Self {
        self.result.human = Some(human.into());
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn status(&self) -> Status {
        self.result.status
    }

    pub fn is_correct(&self) -> bool {
        self.result.status == Status::Correct
    }
}

/// Verdict record printed by exercise-supplied judges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificResult {
    pub result: bool,
    #[serde(default)]
    pub readable_expected: Option<String>,
    #[serde(default)]
    pub readable_actual: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl SpecificResult {
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))
    }
}

// Judge job: testcases plus what the execution layer captured for each

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapturedOutput {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub memory_exceeded: bool,
    #[serde(default)]
    pub execution_time_ms: u64,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testcase {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub output: TestcaseOutput,
    #[serde(default)]
    pub captured: CapturedOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeJob {
    pub id: Uuid,
    #[serde(default)]
    pub language: String,
    pub testcases: Vec<Testcase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Stdout,
    Stderr,
    File,
    Exception,
    Result,
    ExitCode,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::Stdout => "stdout",
            ChannelKind::Stderr => "stderr",
            ChannelKind::File => "file",
            ChannelKind::Exception => "exception",
            ChannelKind::Result => "result",
            ChannelKind::ExitCode => "exit_code",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: ChannelKind,
    #[serde(flatten)]
    pub evaluation: EvaluationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestcaseReport {
    pub testcase_id: u32,
    pub status: Status,
    pub weight: u32,
    pub channels: Vec<ChannelReport>,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeReport {
    pub job_id: Uuid,
    pub overall_status: JobStatus,
    pub score: u64,
    pub max_score: u64,
    pub testcases: Vec<TestcaseReport>,
    pub evaluated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_status() {
        assert_eq!(Status::Correct.worst(Status::Wrong), Status::Wrong);
        assert_eq!(Status::InternalError.worst(Status::Wrong), Status::InternalError);
        assert_eq!(Status::RuntimeError.worst(Status::TimeLimitExceeded), Status::TimeLimitExceeded);
        assert_eq!(Status::MemoryLimitExceeded.worst(Status::TimeLimitExceeded), Status::MemoryLimitExceeded);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&Status::RuntimeError).unwrap(), "\"runtime error\"");
        let status: Status = serde_json::from_str("\"internal error\"").unwrap();
        assert_eq!(status, Status::InternalError);
    }

    #[test]
    fn test_message_from_plain_string() {
        let message: Message = serde_json::from_str("\"Well done\"").unwrap();
        assert_eq!(message, Message::text("Well done"));
    }

    #[test]
    fn test_message_from_object() {
        let message: Message =
            serde_json::from_str(r#"{"description": "<b>hint</b>", "format": "html", "permission": "staff"}"#).unwrap();
        assert_eq!(message.format, "html");
        assert_eq!(message.permission, Permission::Staff);
    }

    #[test]
    fn test_specific_result_parse() {
        let record = SpecificResult::parse(r#"{"result": true, "readable_actual": "42", "messages": ["ok"]}"#).unwrap();
        assert!(record.result);
        assert_eq!(record.readable_expected, None);
        assert_eq!(record.readable_actual.as_deref(), Some("42"));
        assert_eq!(record.messages, vec![Message::text("ok")]);

        assert!(SpecificResult::parse(r#"{"readable_actual": "42"}"#).is_err());
        assert!(SpecificResult::parse("").is_err());
    }

    #[test]
    fn test_evaluation_result_serialization() {
        let result = EvaluationResult::new(Status::Wrong, "1", "2").with_human("nope");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["result"]["enum"], "wrong");
        assert_eq!(json["result"]["human"], "nope");
        assert_eq!(json["readable_actual"], "2");
    }

    #[test]
    fn test_testcase_defaults() {
        let testcase: Testcase = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(testcase.weight, 1);
        assert!(!testcase.captured.timed_out);
        assert!(testcase.captured.stdout.is_none());
    }
}
