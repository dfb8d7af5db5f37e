//! Serialized values exchanged with the code under test.
//!
//! Every value travels as a JSON object `{"type": <tag>, "data": <payload>}`.
//! Decoding is strict: a payload that does not fit its tag is reported as a
//! [`DecodeError`] instead of being coerced.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Number, Value as Json};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("expected an object with a \"type\" field, got {0}")]
    NotAnObject(String),
    #[error("unknown value type '{0}'")]
    UnknownType(String),
    #[error("invalid {tag} payload: {reason}")]
    InvalidData { tag: &'static str, reason: String },
}

fn invalid(tag: &'static str, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidData {
        tag,
        reason: reason.into(),
    }
}

fn preview(json: &Json) -> String {
    let raw = json.to_string();
    if raw.chars().count() > 64 {
        format!("{}...", raw.chars().take(64).collect::<String>())
    } else {
        raw
    }
}

macro_rules! type_tags {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn tag(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

type_tags! {
    /// Width tags for integral values.
    IntegerType {
        Integer => "integer",
        Int8 => "int8",
        UInt8 => "uint8",
        Int16 => "int16",
        UInt16 => "uint16",
        Int32 => "int32",
        UInt32 => "uint32",
        Int64 => "int64",
        UInt64 => "uint64",
        BigInt => "bigint",
    }
}

type_tags! {
    RealType {
        Real => "real",
        Single => "single_precision",
        Double => "double_precision",
        Extended => "double_extended",
        Fixed => "fixed_precision",
    }
}

type_tags! {
    TextType {
        Text => "text",
        Char => "char",
    }
}

type_tags! {
    SequenceType {
        Sequence => "sequence",
        List => "list",
        Array => "array",
        Tuple => "tuple",
    }
}

type_tags! {
    SetType {
        Set => "set",
        FrozenSet => "frozenset",
    }
}

type_tags! {
    MapType {
        Map => "map",
        Dictionary => "dictionary",
        Object => "object",
    }
}

type_tags! {
    NothingType {
        Nothing => "nothing",
        Undefined => "undefined",
        Null => "null",
    }
}

impl IntegerType {
    fn bounds(self) -> Option<(i128, i128)> {
        match self {
            IntegerType::Int8 => Some((i8::MIN.into(), i8::MAX.into())),
            IntegerType::UInt8 => Some((0, u8::MAX.into())),
            IntegerType::Int16 => Some((i16::MIN.into(), i16::MAX.into())),
            IntegerType::UInt16 => Some((0, u16::MAX.into())),
            IntegerType::Int32 => Some((i32::MIN.into(), i32::MAX.into())),
            IntegerType::UInt32 => Some((0, u32::MAX.into())),
            IntegerType::Int64 => Some((i64::MIN.into(), i64::MAX.into())),
            IntegerType::UInt64 => Some((0, u64::MAX.into())),
            IntegerType::Integer | IntegerType::BigInt => None,
        }
    }
}

/// An exception raised by the submission, as reported by the execution layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionValue {
    pub message: String,
    #[serde(default)]
    pub stacktrace: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ExceptionValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stacktrace: String::new(),
            kind: None,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))
    }

    /// Constructor-call rendering, e.g. `ValueError('bad input')`.
    pub fn readable(&self) -> String {
        let kind = self.kind.as_deref().unwrap_or("Exception");
        format!("{}({})", kind, quote(&self.message))
    }

    /// Message followed by the stack trace, as shown when an exception
    /// shows up on a channel where none was expected.
    pub fn with_stacktrace(&self) -> String {
        if self.stacktrace.is_empty() {
            self.message.clone()
        } else {
            format!("{}\n{}", self.message, self.stacktrace)
        }
    }

    fn to_json(&self) -> Json {
        let mut object = serde_json::Map::new();
        object.insert("message".into(), Json::String(self.message.clone()));
        object.insert("stacktrace".into(), Json::String(self.stacktrace.clone()));
        if let Some(kind) = &self.kind {
            object.insert("type".into(), Json::String(kind.clone()));
        }
        Json::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer { kind: IntegerType, data: i128 },
    Real { kind: RealType, data: f64 },
    Text { kind: TextType, data: String },
    Boolean(bool),
    Sequence { kind: SequenceType, data: Vec<Value> },
    Set { kind: SetType, data: Vec<Value> },
    Map { kind: MapType, data: Vec<(Value, Value)> },
    Nothing(NothingType),
    Exception(ExceptionValue),
}

impl Value {
    pub fn text(data: impl Into<String>) -> Self {
        Value::Text {
            kind: TextType::Text,
            data: data.into(),
        }
    }

    pub fn integer(data: i128) -> Self {
        Value::Integer {
            kind: IntegerType::Integer,
            data,
        }
    }

    pub fn real(data: f64) -> Self {
        Value::Real {
            kind: RealType::Real,
            data,
        }
    }

    pub fn nothing() -> Self {
        Value::Nothing(NothingType::Nothing)
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing(_))
    }

    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let json: Json = serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &Json) -> Result<Self, DecodeError> {
        let tag = json
            .as_object()
            .and_then(|object| object.get("type"))
            .and_then(Json::as_str)
            .ok_or_else(|| DecodeError::NotAnObject(preview(json)))?;
        let data = json.get("data").unwrap_or(&Json::Null);

        if let Some(kind) = IntegerType::from_tag(tag) {
            return decode_integer(kind, data);
        }
        if let Some(kind) = RealType::from_tag(tag) {
            return decode_real(kind, data);
        }
        if let Some(kind) = TextType::from_tag(tag) {
            return decode_text(kind, data);
        }
        if let Some(kind) = SequenceType::from_tag(tag) {
            let data = decode_items(kind.tag(), data)?;
            return Ok(Value::Sequence { kind, data });
        }
        if let Some(kind) = SetType::from_tag(tag) {
            let data = decode_items(kind.tag(), data)?;
            return Ok(Value::Set { kind, data });
        }
        if let Some(kind) = MapType::from_tag(tag) {
            return decode_map(kind, data);
        }
        if let Some(kind) = NothingType::from_tag(tag) {
            return Ok(Value::Nothing(kind));
        }

        match tag {
            "boolean" => data.as_bool().map(Value::Boolean).ok_or_else(|| {
                invalid("boolean", format!("expected true or false, got {}", preview(data)))
            }),
            "exception" => serde_json::from_value::<ExceptionValue>(data.clone())
                .map(Value::Exception)
                .map_err(|e| invalid("exception", e.to_string())),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Integer { kind, data } => json!({ "type": kind.tag(), "data": integer_json(*data) }),
            Value::Real { kind, data } => json!({ "type": kind.tag(), "data": real_json(*data) }),
            Value::Text { kind, data } => json!({ "type": kind.tag(), "data": data }),
            Value::Boolean(data) => json!({ "type": "boolean", "data": data }),
            Value::Sequence { kind, data } => json!({
                "type": kind.tag(),
                "data": data.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
            Value::Set { kind, data } => json!({
                "type": kind.tag(),
                "data": data.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
            Value::Map { kind, data } => json!({
                "type": kind.tag(),
                "data": data
                    .iter()
                    .map(|(key, value)| json!({ "key": key.to_json(), "value": value.to_json() }))
                    .collect::<Vec<_>>(),
            }),
            Value::Nothing(kind) => json!({ "type": kind.tag(), "data": Json::Null }),
            Value::Exception(exception) => json!({ "type": "exception", "data": exception.to_json() }),
        }
    }

    /// Human-facing rendering in the style of Python literals. Never used to
    /// decide a verdict.
    pub fn readable(&self) -> String {
        match self {
            Value::Integer { data, .. } => data.to_string(),
            Value::Real { data, .. } => readable_real(*data),
            Value::Text { data, .. } => quote(data),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::Sequence {
                kind: SequenceType::Tuple,
                data,
            } if data.len() == 1 => format!("({},)", data[0].readable()),
            Value::Sequence {
                kind: SequenceType::Tuple,
                data,
            } => format!("({})", join_readable(data)),
            Value::Sequence { data, .. } => format!("[{}]", join_readable(data)),
            Value::Set { kind, data } if data.is_empty() => format!("{}()", kind.tag()),
            Value::Set {
                kind: SetType::Set,
                data,
            } => format!("{{{}}}", join_readable(data)),
            Value::Set {
                kind: SetType::FrozenSet,
                data,
            } => format!("frozenset({{{}}})", join_readable(data)),
            Value::Map { data, .. } => {
                let entries: Vec<String> = data
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.readable(), value.readable()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Value::Nothing(_) => "None".to_string(),
            Value::Exception(exception) => exception.readable(),
        }
    }

    pub fn comparable(&self) -> Comparable {
        match self {
            Value::Integer { data, .. } => Comparable::Integer(*data),
            Value::Real { data, .. } => Comparable::Real(*data),
            Value::Text { data, .. } => Comparable::Text(data.clone()),
            Value::Boolean(data) => Comparable::Boolean(*data),
            Value::Sequence { data, .. } => Comparable::Sequence(data.iter().map(Value::comparable).collect()),
            Value::Set { data, .. } => Comparable::Set(data.iter().map(Value::comparable).collect()),
            Value::Map { data, .. } => {
                let mut entries: Vec<(Comparable, Comparable)> = Vec::with_capacity(data.len());
                for (key, value) in data {
                    let key = key.comparable();
                    let value = value.comparable();
                    match entries.iter_mut().find(|(existing, _)| *existing == key) {
                        Some(slot) => slot.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                Comparable::Map(entries)
            }
            Value::Nothing(_) => Comparable::Nothing,
            Value::Exception(exception) => Comparable::Exception(exception.message.clone()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Value::from_json(&json).map_err(serde::de::Error::custom)
    }
}

/// Canonical form of a [`Value`] used for equality decisions.
#[derive(Debug, Clone)]
pub enum Comparable {
    Nothing,
    Boolean(bool),
    Integer(i128),
    Real(f64),
    Text(String),
    Sequence(Vec<Comparable>),
    Set(Vec<Comparable>),
    Map(Vec<(Comparable, Comparable)>),
    Exception(String),
}

impl PartialEq for Comparable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Nothing, Comparable::Nothing) => true,
            (Comparable::Boolean(a), Comparable::Boolean(b)) => a == b,
            (Comparable::Integer(a), Comparable::Integer(b)) => a == b,
            (Comparable::Integer(a), Comparable::Real(b)) | (Comparable::Real(b), Comparable::Integer(a)) => {
                integer_equals_real(*a, *b)
            }
            (Comparable::Real(a), Comparable::Real(b)) => a == b,
            (Comparable::Text(a), Comparable::Text(b)) => a == b,
            (Comparable::Sequence(a), Comparable::Sequence(b)) => a == b,
            (Comparable::Set(a), Comparable::Set(b)) => {
                a.iter().all(|item| b.contains(item)) && b.iter().all(|item| a.contains(item))
            }
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| b.iter().any(|(k, v)| k == key && v == value))
            }
            (Comparable::Exception(a), Comparable::Exception(b)) => a == b,
            _ => false,
        }
    }
}

/// Exact comparison; a real only equals an integer when it is integral and
/// inside the `i128` range.
fn integer_equals_real(integer: i128, real: f64) -> bool {
    // i128::MAX as f64 rounds up to 2^127, which is already out of range
    real.fract() == 0.0 && real >= i128::MIN as f64 && real < i128::MAX as f64 && integer == real as i128
}

fn decode_integer(kind: IntegerType, data: &Json) -> Result<Value, DecodeError> {
    // Numbers keep their literal digits (arbitrary_precision), so values
    // beyond 64 bits survive; digit strings are accepted for every width
    let digits = match data {
        Json::Number(number) => number.to_string(),
        Json::String(digits) => digits.trim().to_string(),
        other => {
            return Err(invalid(
                kind.tag(),
                format!("expected an integer, got {}", preview(other)),
            ))
        }
    };
    let value = digits
        .parse::<i128>()
        .map_err(|_| invalid(kind.tag(), format!("{digits} is not an integer")))?;

    if let Some((min, max)) = kind.bounds() {
        if value < min || value > max {
            return Err(invalid(kind.tag(), format!("{value} is out of range")));
        }
    }
    Ok(Value::Integer { kind, data: value })
}

fn decode_real(kind: RealType, data: &Json) -> Result<Value, DecodeError> {
    let value = match data {
        Json::Number(number) => number
            .as_f64()
            .ok_or_else(|| invalid(kind.tag(), format!("{number} is not representable")))?,
        Json::String(special) => parse_special_float(special)
            .ok_or_else(|| invalid(kind.tag(), format!("'{special}' is not a number")))?,
        other => {
            return Err(invalid(
                kind.tag(),
                format!("expected a number, got {}", preview(other)),
            ))
        }
    };
    Ok(Value::Real { kind, data: value })
}

fn parse_special_float(raw: &str) -> Option<f64> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        "inf" | "+inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

fn decode_text(kind: TextType, data: &Json) -> Result<Value, DecodeError> {
    let text = data
        .as_str()
        .ok_or_else(|| invalid(kind.tag(), format!("expected a string, got {}", preview(data))))?;
    if kind == TextType::Char && text.chars().count() != 1 {
        return Err(invalid(kind.tag(), format!("'{text}' is not a single character")));
    }
    Ok(Value::Text {
        kind,
        data: text.to_string(),
    })
}

fn decode_items(tag: &'static str, data: &Json) -> Result<Vec<Value>, DecodeError> {
    data.as_array()
        .ok_or_else(|| invalid(tag, format!("expected an array, got {}", preview(data))))?
        .iter()
        .map(Value::from_json)
        .collect()
}

fn decode_map(kind: MapType, data: &Json) -> Result<Value, DecodeError> {
    let entries = data
        .as_array()
        .ok_or_else(|| invalid(kind.tag(), format!("expected an array of entries, got {}", preview(data))))?;

    let data = entries
        .iter()
        .map(|entry| {
            let key = entry
                .get("key")
                .ok_or_else(|| invalid(kind.tag(), "entry without a \"key\""))?;
            let value = entry
                .get("value")
                .ok_or_else(|| invalid(kind.tag(), "entry without a \"value\""))?;
            Ok((Value::from_json(key)?, Value::from_json(value)?))
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;
    Ok(Value::Map { kind, data })
}

fn integer_json(value: i128) -> Json {
    if let Ok(small) = i64::try_from(value) {
        Json::from(small)
    } else if let Ok(unsigned) = u64::try_from(value) {
        Json::from(unsigned)
    } else {
        let digits = value.to_string();
        match digits.parse::<Number>() {
            Ok(number) => Json::Number(number),
            Err(_) => Json::String(digits),
        }
    }
}

fn real_json(value: f64) -> Json {
    match Number::from_f64(value) {
        Some(number) => Json::Number(number),
        None if value.is_nan() => Json::String("nan".into()),
        None if value > 0.0 => Json::String("inf".into()),
        None => Json::String("-inf".into()),
    }
}

fn readable_real(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        let scientific = format!("{value:e}");
        let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        if !(-4..16).contains(&exponent) {
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        } else if value.fract() == 0.0 {
            format!("{value:.1}")
        } else {
            value.to_string()
        }
    }
}

fn join_readable(values: &[Value]) -> String {
    values.iter().map(Value::readable).collect::<Vec<_>>().join(", ")
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
