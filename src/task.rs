//! Task specifications and results.
//!
//! A [`TaskSpec`] pairs a command template with a result key and a parsing
//! mode. Templates may carry `{placeholder}` references resolved per device
//! at dispatch time: first against results earlier tasks in the same run
//! stored for that device, then against the device's attribute bag. That is
//! how a post-check task can read back a value a config task just pushed.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::TemplateError;
use crate::inventory::Device;

/// One parsed row of structured device output: field name -> value.
pub type Record = IndexMap<String, String>;

/// How a task's raw output is turned into a [`TaskResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Keep the raw CLI text as-is.
    Raw,

    /// Run the injected structured-output parser over the text.
    Structured,
}

/// A unit of work executed against one device.
///
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    key: String,
    template: String,
    mode: ParseMode,
}

impl TaskSpec {
    /// A task whose raw output is stored verbatim under `key`.
    pub fn raw(key: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            template: template.into(),
            mode: ParseMode::Raw,
        }
    }

    /// A task whose output is parsed into records before storage.
    pub fn structured(key: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            template: template.into(),
            mode: ParseMode::Structured,
        }
    }

    /// The result key this task stores under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The unrendered command template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The parsing mode.
    pub fn mode(&self) -> ParseMode {
        self.mode
    }
}

/// Outcome of running one [`TaskSpec`] against one device.
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Parsed records from structured mode.
    Structured(Vec<Record>),

    /// Verbatim CLI text from raw mode.
    Raw(String),
}

impl TaskResult {
    /// The parsed records, if this result is structured.
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Self::Structured(records) => Some(records),
            Self::Raw(_) => None,
        }
    }

    /// The raw text, if this result is unparsed.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Raw(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    /// Count records whose `field` satisfies `pred`. Zero for raw results.
    pub fn count_where<F>(&self, field: &str, pred: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        match self {
            Self::Structured(records) => records
                .iter()
                .filter(|r| r.get(field).is_some_and(|v| pred(v)))
                .count(),
            Self::Raw(_) => 0,
        }
    }
}

/// Per-device scope handed to each task invocation.
///
/// Gives a task read access to its device's attributes and to the results
/// earlier tasks in the same run produced for this device, and nothing else.
pub struct TaskContext<'a> {
    device: &'a Device,
    completed: &'a IndexMap<String, TaskResult>,
}

impl<'a> TaskContext<'a> {
    /// Build a scope over `device` and the results completed so far.
    pub fn new(device: &'a Device, completed: &'a IndexMap<String, TaskResult>) -> Self {
        Self { device, completed }
    }

    /// The device this scope belongs to.
    pub fn device(&self) -> &Device {
        self.device
    }

    /// A device attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.device.attribute(key)
    }

    /// A result an earlier task in this run stored for this device.
    pub fn result(&self, key: &str) -> Option<&TaskResult> {
        self.completed.get(key)
    }

    /// Render a command template against this scope.
    ///
    /// `{name}` resolves to the raw text of an earlier result under `name`,
    /// falling back to the device attribute `name`. Scalar attributes render
    /// with their plain form (no JSON quoting). `{{` emits a literal `{`;
    /// `}` outside a placeholder is already literal.
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            if let Some(after_escape) = after.strip_prefix('{') {
                out.push('{');
                rest = after_escape;
                continue;
            }
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::UnclosedPlaceholder {
                    template: template.to_string(),
                })?;
            let placeholder = &after[..close];
            out.push_str(&self.resolve(placeholder)?);
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn resolve(&self, placeholder: &str) -> Result<String, TemplateError> {
        if let Some(result) = self.completed.get(placeholder) {
            return match result {
                TaskResult::Raw(text) => Ok(text.trim_end().to_string()),
                TaskResult::Structured(_) => Err(TemplateError::UnrenderableValue {
                    placeholder: placeholder.to_string(),
                    device: self.device.name.clone(),
                }),
            };
        }

        match self.device.attribute(placeholder) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(_) => Err(TemplateError::UnrenderableValue {
                placeholder: placeholder.to_string(),
                device: self.device.name.clone(),
            }),
            None => Err(TemplateError::UnresolvedPlaceholder {
                placeholder: placeholder.to_string(),
                device: self.device.name.clone(),
            }),
        }
    }
}
