//! A text input with a filterable dropdown of options, used by the notes picker.

use super::append_text_node;
use super::new_overlay_node;
use super::set_class;
use super::set_hidden;
use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::NodeId;

pub const NO_MATCHES_TEXT: &str = "No matches found";

#[derive(Debug)]
pub struct SearchableSelect {
    wrapper: NodeId,
    input: NodeId,
    dropdown: NodeId,
    options: Vec<String>,
    selected: Option<String>,
    query: String,
    open: bool,
    option_nodes: Vec<(NodeId, String)>,
}

impl SearchableSelect {
    /// Build the select under `parent`, selecting `selected` (or the first option).
    pub(crate) fn mount(
        doc: &mut Document,
        parent: NodeId,
        options: Vec<String>,
        selected: Option<String>,
    ) -> Result<Self, DomError> {
        let wrapper = new_overlay_node(doc, "div", "searchable-select")?;
        doc.append_child(parent, wrapper)?;
        let input = new_overlay_node(doc, "input", "searchable-select-input")?;
        doc.set_attribute(input, "type", "text")?;
        doc.append_child(wrapper, input)?;
        let dropdown = new_overlay_node(doc, "div", "searchable-select-dropdown")?;
        doc.append_child(wrapper, dropdown)?;

        let mut select = Self {
            wrapper,
            input,
            dropdown,
            options: Vec::new(),
            selected: None,
            query: String::new(),
            open: false,
            option_nodes: Vec::new(),
        };
        select.set_options(doc, options, selected)?;
        Ok(select)
    }

    /// Replace the options; keeps `selected` when it is one of them, else picks the first.
    pub(crate) fn set_options(
        &mut self,
        doc: &mut Document,
        options: Vec<String>,
        selected: Option<String>,
    ) -> Result<(), DomError> {
        self.selected = selected
            .filter(|value| options.contains(value))
            .or_else(|| options.first().cloned());
        self.options = options;
        self.query.clear();
        doc.set_value(self.input, "")?;
        self.sync_placeholder(doc)?;
        self.render(doc)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn option_nodes(&self) -> &[(NodeId, String)] {
        &self.option_nodes
    }

    pub fn owns(&self, doc: &Document, node: NodeId) -> bool {
        doc.contains(self.wrapper, node)
    }

    /// Options containing the query, case-insensitively, in their original order.
    pub fn filtered(&self) -> Vec<&str> {
        let needle = self.query.to_lowercase();
        self.options
            .iter()
            .filter(|option| option.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    pub(crate) fn open(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.open = true;
        self.render(doc)
    }

    pub(crate) fn close(&mut self, doc: &mut Document) -> Result<(), DomError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.render(doc)
    }

    /// Re-read the query from the input and refilter.
    pub(crate) fn handle_input(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.query = doc.value(self.input)?.to_string();
        self.open = true;
        self.render(doc)
    }

    /// Option whose dropdown row contains `node`.
    pub(crate) fn option_at(&self, doc: &Document, node: NodeId) -> Option<&str> {
        self.option_nodes
            .iter()
            .find(|(option_node, _)| doc.contains(*option_node, node))
            .map(|(_, value)| value.as_str())
    }

    /// Select `value`, clear the query and close the dropdown.
    pub(crate) fn select(&mut self, doc: &mut Document, value: &str) -> Result<(), DomError> {
        if !self.options.iter().any(|option| option == value) {
            return Ok(());
        }
        self.selected = Some(value.to_string());
        self.query.clear();
        doc.set_value(self.input, "")?;
        self.sync_placeholder(doc)?;
        self.open = false;
        self.render(doc)
    }

    fn sync_placeholder(&self, doc: &mut Document) -> Result<(), DomError> {
        let placeholder = self.selected.as_deref().unwrap_or("Search...");
        doc.set_attribute(self.input, "placeholder", placeholder)
    }

    fn render(&mut self, doc: &mut Document) -> Result<(), DomError> {
        doc.clear_children(self.dropdown)?;
        self.option_nodes.clear();
        set_hidden(doc, self.dropdown, !self.open)?;
        if !self.open {
            return Ok(());
        }

        let filtered: Vec<String> = self.filtered().into_iter().map(str::to_string).collect();
        if filtered.is_empty() {
            append_text_node(
                doc,
                self.dropdown,
                "div",
                "searchable-select-no-results",
                NO_MATCHES_TEXT,
            )?;
            return Ok(());
        }
        for option in filtered {
            let node = append_text_node(doc, self.dropdown, "div", "searchable-select-item", &option)?;
            set_class(doc, node, "selected", self.selected.as_deref() == Some(option.as_str()))?;
            self.option_nodes.push((node, option));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Size;
    use pretty_assertions::assert_eq;

    fn mount(doc: &mut Document) -> SearchableSelect {
        let parent = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, parent).expect("append");
        SearchableSelect::mount(
            doc,
            parent,
            vec![
                "Billing".to_string(),
                "Customer Service".to_string(),
                "Shipping".to_string(),
            ],
            None,
        )
        .expect("mount")
    }

    #[test]
    fn defaults_to_first_option() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let select = mount(&mut doc);
        assert_eq!(select.selected(), Some("Billing"));
        assert_eq!(doc.attribute(select.input(), "placeholder"), Some("Billing"));
        assert!(!select.is_open());
    }

    #[test]
    fn typing_filters_case_insensitively() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let mut select = mount(&mut doc);
        doc.set_value(select.input(), "ING").expect("value");
        select.handle_input(&mut doc).expect("input");

        let shown: Vec<&str> = select
            .option_nodes()
            .iter()
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(shown, vec!["Billing", "Shipping"]);
        assert!(doc.has_class(select.option_nodes()[0].0, "selected"));
    }

    #[test]
    fn empty_filter_shows_no_matches() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let mut select = mount(&mut doc);
        doc.set_value(select.input(), "zzz").expect("value");
        select.handle_input(&mut doc).expect("input");

        let empty = doc.find_by_class("searchable-select-no-results");
        assert_eq!(empty.len(), 1);
        assert_eq!(doc.text_content(empty[0]), NO_MATCHES_TEXT);
    }

    #[test]
    fn clicking_an_option_selects_and_closes() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let mut select = mount(&mut doc);
        select.open(&mut doc).expect("open");
        let (node, _) = select.option_nodes()[2].clone();
        let value = select.option_at(&doc, node).map(str::to_string).expect("option");
        select.select(&mut doc, &value).expect("select");

        assert_eq!(select.selected(), Some("Shipping"));
        assert!(!select.is_open());
        assert!(select.option_nodes().is_empty());
    }
}
