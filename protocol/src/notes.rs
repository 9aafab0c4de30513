use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// A note template. `{Name}` spans in `text` are placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTemplate {
    pub text: String,
}

/// One piece of a template as shown in the picker preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    Placeholder(String),
}

impl NoteTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Split the template into literal text and placeholders, in order.
    ///
    /// A placeholder is `{` followed by at least one character other than `}` and then `}`.
    /// Braces that do not form a placeholder stay literal.
    pub fn segments(&self) -> Vec<TemplateSegment> {
        let text = self.text.as_str();
        let mut out = Vec::new();
        let mut literal_start = 0;
        let mut search_from = 0;

        while let Some(open_rel) = text[search_from..].find('{') {
            let open = search_from + open_rel;
            let Some(close_rel) = text[open + 1..].find('}') else {
                break;
            };
            let close = open + 1 + close_rel;
            if close == open + 1 {
                // `{}` is not a placeholder; keep scanning after it.
                search_from = close + 1;
                continue;
            }

            if literal_start < open {
                out.push(TemplateSegment::Literal(text[literal_start..open].to_string()));
            }
            out.push(TemplateSegment::Placeholder(text[open + 1..close].to_string()));
            literal_start = close + 1;
            search_from = close + 1;
        }

        if literal_start < text.len() {
            out.push(TemplateSegment::Literal(text[literal_start..].to_string()));
        }
        out
    }

    /// Placeholder names in order of appearance (duplicates included).
    pub fn placeholders(&self) -> Vec<String> {
        self.segments()
            .into_iter()
            .filter_map(|segment| match segment {
                TemplateSegment::Placeholder(name) => Some(name),
                TemplateSegment::Literal(_) => None,
            })
            .collect()
    }

    /// Replace placeholders positionally with `values`.
    ///
    /// A missing or empty value leaves the literal `{Name}` in place.
    pub fn fill(&self, values: &[String]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut placeholder_idx = 0;
        for segment in self.segments() {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(&text),
                TemplateSegment::Placeholder(name) => {
                    match values.get(placeholder_idx).filter(|v| !v.is_empty()) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(&name);
                            out.push('}');
                        }
                    }
                    placeholder_idx += 1;
                }
            }
        }
        out
    }
}

/// Topic → subtopic → template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteTemplates {
    topics: IndexMap<String, IndexMap<String, NoteTemplate>>,
}

impl NoteTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn subtopics(&self, topic: &str) -> Vec<&str> {
        self.topics
            .get(topic)
            .map(|subtopics| subtopics.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, topic: &str, subtopic: &str) -> Option<&NoteTemplate> {
        self.topics.get(topic)?.get(subtopic)
    }

    pub fn insert(&mut self, topic: &str, subtopic: &str, text: &str) -> Option<NoteTemplate> {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(subtopic.to_string(), NoteTemplate::new(text))
    }

    /// Remove a template; a topic left without subtopics is removed too.
    pub fn remove(&mut self, topic: &str, subtopic: &str) -> Option<NoteTemplate> {
        let subtopics = self.topics.get_mut(topic)?;
        let removed = subtopics.shift_remove(subtopic);
        if subtopics.is_empty() {
            self.topics.shift_remove(topic);
        }
        removed
    }

    /// Every template as `(topic, subtopic, template)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &NoteTemplate)> {
        self.topics.iter().flat_map(|(topic, subtopics)| {
            subtopics
                .iter()
                .map(move |(subtopic, note)| (topic.as_str(), subtopic.as_str(), note))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn segments_split_literals_and_placeholders() {
        let note = NoteTemplate::new("Dear {Name},\nThanks from {Company Name}.");
        assert_eq!(
            note.segments(),
            vec![
                TemplateSegment::Literal("Dear ".to_string()),
                TemplateSegment::Placeholder("Name".to_string()),
                TemplateSegment::Literal(",\nThanks from ".to_string()),
                TemplateSegment::Placeholder("Company Name".to_string()),
                TemplateSegment::Literal(".".to_string()),
            ]
        );
    }

    #[test]
    fn empty_and_unclosed_braces_stay_literal() {
        let note = NoteTemplate::new("a {} b {open");
        assert_eq!(
            note.segments(),
            vec![TemplateSegment::Literal("a {} b {open".to_string())]
        );
        assert!(note.placeholders().is_empty());
    }

    #[test]
    fn fill_leaves_unresolved_placeholders_literal() {
        let note = NoteTemplate::new("Hi {Name}, from {Agent}");
        let filled = note.fill(&["Ada".to_string(), String::new()]);
        assert_eq!(filled, "Hi Ada, from {Agent}");
        assert_eq!(note.fill(&[]), "Hi {Name}, from {Agent}");
    }

    #[test]
    fn fill_is_positional_for_repeated_names() {
        let note = NoteTemplate::new("{X} and {X}");
        assert_eq!(note.fill(&["a".to_string(), "b".to_string()]), "a and b");
    }

    #[test]
    fn removing_last_subtopic_drops_topic() {
        let mut notes = NoteTemplates::new();
        notes.insert("Support", "Greeting", "Hello");
        notes.insert("Support", "Closing", "Bye");

        notes.remove("Support", "Greeting");
        assert_eq!(notes.subtopics("Support"), vec!["Closing"]);

        notes.remove("Support", "Closing");
        assert!(notes.is_empty());
    }

    #[test]
    fn deserializes_original_store_shape() {
        let notes: NoteTemplates =
            serde_json::from_str(r#"{"Customer Service":{"Greeting":{"text":"Dear {Name}"}}}"#)
                .expect("deserialize");
        assert_eq!(
            notes.get("Customer Service", "Greeting").map(|n| n.text.as_str()),
            Some("Dear {Name}")
        );
    }
}
