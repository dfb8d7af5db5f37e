//! Catalog of the human-facing texts produced by the evaluators.
//!
//! Texts are looked up by [`MessageKey`] in a built-in table for the run's
//! natural language (English and Dutch ship with the crate). A run may
//! replace individual texts through `options.messages` in its configuration.
//! Placeholders are written as `{name}` and filled in by [`Messages::format`].

use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ValueNotRecognized,
    ExceptionNotRecognized,
    ResultNotRecognized,
    ReceivedNoOutput,
    ReceivedNothing,
    OneValueIsNothing,
    OutputFileMissing,
    CustomEvaluatorFailed,
    DecodeDiagnostic,
    CustomEvaluatorTimedOut,
    CustomEvaluatorOutOfMemory,
    ChannelNotEvaluated,
}

impl MessageKey {
    pub const ALL: [MessageKey; 12] = [
        MessageKey::ValueNotRecognized,
        MessageKey::ExceptionNotRecognized,
        MessageKey::ResultNotRecognized,
        MessageKey::ReceivedNoOutput,
        MessageKey::ReceivedNothing,
        MessageKey::OneValueIsNothing,
        MessageKey::OutputFileMissing,
        MessageKey::CustomEvaluatorFailed,
        MessageKey::DecodeDiagnostic,
        MessageKey::CustomEvaluatorTimedOut,
        MessageKey::CustomEvaluatorOutOfMemory,
        MessageKey::ChannelNotEvaluated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::ValueNotRecognized => "evaluators.value.unrecognized",
            MessageKey::ExceptionNotRecognized => "evaluators.exception.unrecognized",
            MessageKey::ResultNotRecognized => "evaluators.specific.unrecognized",
            MessageKey::ReceivedNoOutput => "evaluators.received-no-output",
            MessageKey::ReceivedNothing => "evaluators.received-nothing",
            MessageKey::OneValueIsNothing => "evaluators.value.one-is-nothing",
            MessageKey::OutputFileMissing => "evaluators.file.missing",
            MessageKey::CustomEvaluatorFailed => "evaluators.custom.failed",
            MessageKey::DecodeDiagnostic => "evaluators.decode-diagnostic",
            MessageKey::CustomEvaluatorTimedOut => "evaluators.custom.timed-out",
            MessageKey::CustomEvaluatorOutOfMemory => "evaluators.custom.out-of-memory",
            MessageKey::ChannelNotEvaluated => "judge.channel-not-evaluated",
        }
    }

    fn english(self) -> &'static str {
        match self {
            MessageKey::ValueNotRecognized => {
                "Your return value was wrong; additionally the judge didn't recognize it. Contact staff for more information."
            }
            MessageKey::ExceptionNotRecognized => "Something went wrong while receiving the exception. Contact staff.",
            MessageKey::ResultNotRecognized => "Something went wrong while receiving the test result. Contact staff.",
            MessageKey::ReceivedNoOutput => "Received no output.",
            MessageKey::ReceivedNothing => "Received nothing.",
            MessageKey::OneValueIsNothing => "One of the values is nothing.",
            MessageKey::OutputFileMissing => "Required output file not found.",
            MessageKey::CustomEvaluatorFailed => "An error occurred while evaluating your exercise.",
            MessageKey::DecodeDiagnostic => "Received {actual}, which caused {error} for {stage}.",
            MessageKey::CustomEvaluatorTimedOut => "The evaluator program did not finish within {seconds} seconds.",
            MessageKey::CustomEvaluatorOutOfMemory => "The evaluator program exceeded its memory limit.",
            MessageKey::ChannelNotEvaluated => "The {channel} channel could not be evaluated: {error}",
        }
    }

    fn dutch(self) -> &'static str {
        match self {
            MessageKey::ValueNotRecognized => {
                "Je returnwaarde was fout; bovendien werd ze niet herkend door de judge. Contacteer het onderwijsteam voor meer informatie."
            }
            MessageKey::ExceptionNotRecognized => {
                "Er ging iets mis bij het ontvangen van de exception. Contacteer het onderwijsteam."
            }
            MessageKey::ResultNotRecognized => {
                "Er ging iets mis bij het ontvangen van het testresultaat. Contacteer het onderwijsteam."
            }
            MessageKey::ReceivedNoOutput => "Geen uitvoer ontvangen.",
            MessageKey::ReceivedNothing => "Niets ontvangen.",
            MessageKey::OneValueIsNothing => "Een van de waarden is niets.",
            MessageKey::OutputFileMissing => "Vereist uitvoerbestand niet gevonden.",
            MessageKey::CustomEvaluatorFailed => "Er trad een fout op bij het evalueren van je oefening.",
            MessageKey::DecodeDiagnostic => "Ontving {actual}, wat {error} veroorzaakte bij {stage}.",
            MessageKey::CustomEvaluatorTimedOut => "Het evaluatieprogramma was niet klaar binnen {seconds} seconden.",
            MessageKey::CustomEvaluatorOutOfMemory => "Het evaluatieprogramma gebruikte te veel geheugen.",
            MessageKey::ChannelNotEvaluated => "Het kanaal {channel} kon niet beoordeeld worden: {error}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Locale {
    English,
    Dutch,
}

#[derive(Debug, Clone)]
pub struct Messages {
    locale: Locale,
    overrides: HashMap<String, String>,
}

impl Default for Messages {
    fn default() -> Self {
        Self::for_language("en")
    }
}

impl Messages {
    /// Unknown languages fall back to English.
    pub fn for_language(language: &str) -> Self {
        let locale = match language.to_ascii_lowercase().as_str() {
            "nl" | "nl-be" | "nl-nl" => Locale::Dutch,
            "en" | "en-gb" | "en-us" | "" => Locale::English,
            other => {
                warn!(language = other, "No message catalog for language, using English");
                Locale::English
            }
        };
        Self {
            locale,
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        for key in overrides.keys() {
            if !MessageKey::ALL.iter().any(|known| known.as_str() == key) {
                warn!(key = %key, "Ignoring override for unknown message key");
            }
        }
        self.overrides.extend(overrides);
        self
    }

    pub fn get(&self, key: MessageKey) -> String {
        if let Some(text) = self.overrides.get(key.as_str()) {
            return text.clone();
        }
        let text = match self.locale {
            Locale::English => key.english(),
            Locale::Dutch => key.dutch(),
        };
        text.to_string()
    }

    /// Fill `{name}` placeholders in one pass. Inserted values are never
    /// scanned again, and unknown placeholders are kept as written.
    pub fn format(&self, key: MessageKey, params: &[(&str, &str)]) -> String {
        let template = self.get(key);
        let mut text = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(open) = rest.find('{') {
            text.push_str(&rest[..open]);
            let candidate = &rest[open + 1..];
            let replacement = candidate.find('}').and_then(|close| {
                let name = &candidate[..close];
                params
                    .iter()
                    .find(|(param, _)| *param == name)
                    .map(|(_, value)| (*value, close))
            });
            match replacement {
                Some((value, close)) => {
                    text.push_str(value);
                    rest = &candidate[close + 1..];
                }
                None => {
                    text.push('{');
                    rest = candidate;
                }
            }
        }
        text.push_str(rest);
        text
    }
}
