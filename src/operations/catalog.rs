//! Operation definitions and the registry presented to the classifier

use crate::llm::ToolDefinition;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Unique operation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationId {
    RetrieveData,
    FormatContent,
    CountDays,
    SortContacts,
    RecentLogs,
    FileContents,
    ExtractEmail,
    ExtractCreditCard,
    EmbeddingComments,
    TicketSales,
    TaskRunner,
}

impl OperationId {
    /// Presentation order for the model
    pub const ALL: [OperationId; 11] = [
        OperationId::RetrieveData,
        OperationId::FormatContent,
        OperationId::CountDays,
        OperationId::SortContacts,
        OperationId::RecentLogs,
        OperationId::FileContents,
        OperationId::ExtractEmail,
        OperationId::ExtractCreditCard,
        OperationId::EmbeddingComments,
        OperationId::TicketSales,
        OperationId::TaskRunner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationId::RetrieveData => "retrieve_data",
            OperationId::FormatContent => "format_content",
            OperationId::CountDays => "count_days",
            OperationId::SortContacts => "sort_contacts",
            OperationId::RecentLogs => "recent_logs",
            OperationId::FileContents => "file_contents",
            OperationId::ExtractEmail => "extract_email",
            OperationId::ExtractCreditCard => "extract_credit_card",
            OperationId::EmbeddingComments => "embedding_comments",
            OperationId::TicketSales => "ticket_sales",
            OperationId::TaskRunner => "task_runner",
        }
    }

    /// The catch-all that routes into code synthesis
    pub fn is_synthesis(&self) -> bool {
        matches!(self, OperationId::TaskRunner)
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Integer,
    StringArray,
    /// A filesystem path that must stay inside the sandbox
    Path,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
}

impl ParamSpec {
    const fn new(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }

    fn schema(&self) -> Value {
        match self.kind {
            ParamType::Text | ParamType::Path => {
                json!({"type": "string", "description": self.description})
            }
            ParamType::Integer => json!({"type": "integer", "description": self.description}),
            ParamType::StringArray => json!({
                "type": "array",
                "description": self.description,
                "items": {"type": "string"}
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub id: OperationId,
    pub description: &'static str,
    /// Declaration order is the order shown to the model
    pub params: Vec<ParamSpec>,
    pub required: Vec<&'static str>,
}

impl OperationSpec {
    pub fn name(&self) -> &'static str {
        self.id.as_str()
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn tool_definition(&self) -> ToolDefinition {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();

        ToolDefinition {
            name: self.name().to_string(),
            description: self.description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": self.required,
            }),
        }
    }
}

const OUTPUT_FILE: &str = "Filepath and name to save the output e.g. /data/path/to/output.txt";

/// Builtin operation catalog
pub fn builtin_specs() -> Vec<OperationSpec> {
    use ParamType::*;

    vec![
        OperationSpec {
            id: OperationId::RetrieveData,
            description: "Any variation referring to retrieving data from the GitHub user content site",
            params: vec![
                ParamSpec::new("url", Text, "A GitHub user content url e.g. https://raw.githubusercontent.com/..."),
                ParamSpec::new("email", Text, "An email is required to download the files e.g. example@email.com"),
            ],
            required: vec!["url", "email"],
        },
        OperationSpec {
            id: OperationId::FormatContent,
            description: "Format the contents of a file",
            params: vec![
                ParamSpec::new("prettier", Text, "Prettier version to use to format the document e.g. prettier@X.X.X"),
                ParamSpec::new("input", Path, "Filepath and name that contains the contents to format e.g. /data/path/to/file.md"),
            ],
            required: vec!["input"],
        },
        OperationSpec {
            id: OperationId::CountDays,
            description: "Any variation referring to counting how many dates in a list fall on a given day of the week",
            params: vec![
                ParamSpec::new("days", Text, "Day of the week e.g. Monday, Tues, Wed, Thursday, Friday, Saturday, Sunday"),
                ParamSpec::new("input", Path, "Filepath and name that contains the dates e.g. /data/path/to/file.txt"),
                ParamSpec::new("output", Path, OUTPUT_FILE),
            ],
            required: vec!["days", "input", "output"],
        },
        OperationSpec {
            id: OperationId::SortContacts,
            description: "Any variation referring to retrieving and sorting an array of contacts",
            params: vec![
                ParamSpec::new("conditions", StringArray, "Sort keys for the contacts in priority order e.g. last_name then first_name"),
                ParamSpec::new("input", Path, "Filepath and name that contains the contacts e.g. /data/path/to/file.json"),
                ParamSpec::new("output", Path, "Filepath and name to save the output e.g. /data/path/to/output.json"),
            ],
            required: vec!["conditions", "input", "output"],
        },
        OperationSpec {
            id: OperationId::RecentLogs,
            description: "Any variation of extracting the first line of the most recent log files",
            params: vec![
                ParamSpec::new("count", Integer, "Number of log files to read e.g. 10"),
                ParamSpec::new("input", Path, "Directory that contains the .log files e.g. /data/logs/"),
                ParamSpec::new("output", Path, OUTPUT_FILE),
            ],
            required: vec!["count", "input", "output"],
        },
        OperationSpec {
            id: OperationId::FileContents,
            description: "Any variation referring to indexing files by the first heading found in each file",
            params: vec![
                ParamSpec::new("filetype", Text, "File extension to search for e.g. .md .json"),
                ParamSpec::new("input", Path, "Directory that contains the files to be indexed e.g. /data/docs/"),
                ParamSpec::new("output", Path, "Filepath and name to save the output e.g. /data/path/to/index.json"),
            ],
            required: vec!["filetype", "input", "output"],
        },
        OperationSpec {
            id: OperationId::ExtractEmail,
            description: "Any variation referring to retrieving and extracting the sender's email address",
            params: vec![
                ParamSpec::new("input", Path, "Filepath and name that contains the email message e.g. /data/path/to/email.txt"),
                ParamSpec::new("output", Path, OUTPUT_FILE),
            ],
            required: vec!["input", "output"],
        },
        OperationSpec {
            id: OperationId::ExtractCreditCard,
            description: "Any variation referring to retrieving and extracting the credit card number from an image file",
            params: vec![
                ParamSpec::new("input", Path, "Filepath and name of the image e.g. /data/path/to/card.png"),
                ParamSpec::new("output", Path, OUTPUT_FILE),
            ],
            required: vec!["input", "output"],
        },
        OperationSpec {
            id: OperationId::EmbeddingComments,
            description: "Any variation referring to finding the most similar pair of comments using embeddings",
            params: vec![
                ParamSpec::new("input", Path, "Filepath and name that contains one comment per line e.g. /data/comments.txt"),
                ParamSpec::new("output", Path, OUTPUT_FILE),
            ],
            required: vec!["input", "output"],
        },
        OperationSpec {
            id: OperationId::TicketSales,
            description: "Any variation referring to retrieving and extracting total ticket sales",
            params: vec![
                ParamSpec::new("type", Text, "A description of the ticket type e.g. Gold, Silver, Bronze"),
                ParamSpec::new("input", Path, "Filepath of the SQLite database e.g. /data/ticket-sales.db"),
                ParamSpec::new("output", Path, OUTPUT_FILE),
            ],
            required: vec!["type", "input", "output"],
        },
        OperationSpec {
            id: OperationId::TaskRunner,
            description: "Any variation of the user requesting to create code, execute code, or run code",
            params: vec![
                ParamSpec::new("input", Path, "Filepath of information used by the code, must start with the data directory e.g. /data/path/to/input"),
                ParamSpec::new("output", Path, "Filepath to save the output, must start with the data directory e.g. /data/path/to/output"),
            ],
            required: vec![],
        },
    ]
}

/// Registry of operations indexed by wire name
pub struct OperationRegistry {
    specs: Vec<OperationSpec>,
    by_name: AHashMap<&'static str, usize>,
}

impl OperationRegistry {
    pub fn new(specs: Vec<OperationSpec>) -> Self {
        let by_name = specs
            .iter()
            .enumerate()
            .map(|(idx, spec)| (spec.name(), idx))
            .collect();
        Self { specs, by_name }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_specs())
    }

    /// Look up a spec by the name the model returned
    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.by_name.get(name).map(|&idx| &self.specs[idx])
    }

    pub fn spec(&self, id: OperationId) -> Option<&OperationSpec> {
        self.get(id.as_str())
    }

    pub fn specs(&self) -> &[OperationSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Function schemas in presentation order
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.specs.iter().map(OperationSpec::tool_definition).collect()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_id_has_a_spec() {
        let registry = OperationRegistry::builtin();
        assert_eq!(registry.len(), OperationId::ALL.len());
        for id in OperationId::ALL {
            let spec = registry.spec(id).expect("spec registered");
            assert_eq!(spec.id, id);
        }
    }

    #[test]
    fn test_name_round_trip() {
        let registry = OperationRegistry::builtin();
        for id in OperationId::ALL {
            assert_eq!(registry.get(id.as_str()).map(|spec| spec.id), Some(id));
        }
        assert!(registry.get("delete_everything").is_none());
    }

    #[test]
    fn test_required_params_are_declared() {
        for spec in builtin_specs() {
            for required in &spec.required {
                assert!(
                    spec.param(required).is_some(),
                    "{} requires undeclared {}",
                    spec.name(),
                    required
                );
            }
        }
    }

    #[test]
    fn test_input_and_output_are_paths() {
        for spec in builtin_specs() {
            for name in ["input", "output"] {
                if let Some(param) = spec.param(name) {
                    assert_eq!(param.kind, ParamType::Path, "{}.{}", spec.name(), name);
                }
            }
        }
    }

    #[test]
    fn test_tool_definitions_keep_order_and_schema() {
        let tools = OperationRegistry::builtin().tool_definitions();
        assert_eq!(tools[0].name, "retrieve_data");
        assert_eq!(tools.last().unwrap().name, "task_runner");

        let count_days = tools.iter().find(|t| t.name == "count_days").unwrap();
        assert_eq!(count_days.parameters["type"], "object");
        assert_eq!(count_days.parameters["properties"]["input"]["type"], "string");
        assert_eq!(
            count_days.parameters["required"],
            json!(["days", "input", "output"])
        );

        let sort = tools.iter().find(|t| t.name == "sort_contacts").unwrap();
        assert_eq!(sort.parameters["properties"]["conditions"]["type"], "array");
    }

    #[test]
    fn test_unknown_name_not_found() {
        assert!(OperationRegistry::builtin().get("rm_rf").is_none());
    }
}
