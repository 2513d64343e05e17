//! Rule/symbolizer registry for one style

use ahash::AHashSet;
use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::error::{Result, StyleError};
use crate::registry::classifier::{ClassificationRequest, Classifier};
use crate::registry::filter_session::FilterEditor;
use crate::registry::kind::{editor_for, EditorKind, RuleKind};
use crate::style::{validate, Rule, Style, Symbolizer, SymbolizerKind};

/// Direction for [`StyleEditor::move_rule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Toward index 0
    Up,
    Down,
}

/// Result of [`StyleEditor::add_rule`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddRuleOutcome {
    /// A rule was appended and selected
    Created { index: usize, editor: EditorKind },
    /// Classification parameters were staged; no rule exists yet
    Staged,
}

/// Owns a style and tracks the active rule and symbolizer.
///
/// The active references are indices, fixed up on every move and delete.
/// All mutations are synchronous; operations that cannot apply (bad index,
/// no active rule) are no-ops reported through the return value.
#[derive(Debug, Clone)]
pub struct StyleEditor {
    style: Style,
    config: EditorConfig,
    active_rule: Option<usize>,
    active_symbolizer: Option<usize>,
    filter: FilterEditor,
    staged: Option<ClassificationRequest>,
}

impl StyleEditor {
    pub fn new(style: Style) -> Self {
        Self::with_config(style, EditorConfig::default())
    }

    pub fn with_config(style: Style, config: EditorConfig) -> Self {
        Self {
            style,
            config,
            active_rule: None,
            active_symbolizer: None,
            filter: FilterEditor::new(),
            staged: None,
        }
    }

    /// Load and validate a style from JSON
    pub fn from_json(json: &str, config: EditorConfig) -> Result<Self> {
        Ok(Self::with_config(Style::from_json(json)?, config))
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn into_style(self) -> Style {
        self.style
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Rule] {
        &self.style.rules
    }

    pub fn to_json(&self) -> Result<String> {
        self.style.to_json()
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// Start a new classification.
    ///
    /// Manual and raster kinds append a rule and select it. Automatic kinds
    /// only stage a classification request; see [`Self::apply_classification`].
    pub fn add_rule(&mut self, kind: RuleKind) -> AddRuleOutcome {
        let rule = match kind {
            RuleKind::Manual => Rule::new(self.next_rule_name()),
            RuleKind::RasterPalette => Rule::new(self.next_rule_name()).with_symbolizer(
                self.config.symbolizers.symbolizer(SymbolizerKind::RasterPalette),
            ),
            RuleKind::RasterCell => Rule::new(self.next_rule_name()).with_symbolizer(
                self.config.symbolizers.symbolizer(SymbolizerKind::RasterCell),
            ),
            RuleKind::AutoInterval => {
                self.staged = Some(ClassificationRequest::intervals(
                    "",
                    self.config.default_class_count,
                    self.config.default_palette.clone(),
                ));
                debug!(kind = %kind, "classification staged");
                return AddRuleOutcome::Staged;
            }
            RuleKind::AutoUnique => {
                self.staged = Some(ClassificationRequest::unique(
                    "",
                    self.config.default_palette.clone(),
                ));
                debug!(kind = %kind, "classification staged");
                return AddRuleOutcome::Staged;
            }
        };

        self.style.rules.push(rule);
        let index = self.style.rules.len() - 1;
        let editor = self.select_rule(index).unwrap_or(EditorKind::Generic);
        AddRuleOutcome::Created { index, editor }
    }

    /// Smallest unused `"{prefix} {n}"`
    pub fn next_rule_name(&self) -> String {
        let taken: AHashSet<&str> = self.style.rules.iter().map(|r| r.name.as_str()).collect();
        (1..)
            .map(|n| format!("{} {}", self.config.rule_name_prefix, n))
            .find(|name| !taken.contains(name.as_str()))
            .unwrap_or_default()
    }

    /// Make rule `index` active and load its filter for editing.
    ///
    /// Returns the editor the rule routes to, or `None` for a bad index.
    pub fn select_rule(&mut self, index: usize) -> Option<EditorKind> {
        let rule = self.style.rules.get(index)?;
        let editor = editor_for(rule);
        if let Err(e) = self.filter.load(rule.filter.as_deref()) {
            debug!(index, rule = %rule.name, error = %e, "filter opened as raw text");
        }

        self.active_rule = Some(index);
        self.active_symbolizer = None;
        debug!(index, rule = %rule.name, editor = editor.as_str(), "rule selected");
        Some(editor)
    }

    pub fn select_rule_by_name(&mut self, name: &str) -> Option<EditorKind> {
        let index = self.style.position(name)?;
        self.select_rule(index)
    }

    pub fn deselect_rule(&mut self) {
        self.active_rule = None;
        self.active_symbolizer = None;
        self.filter = FilterEditor::new();
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_rule
    }

    pub fn active_rule(&self) -> Option<&Rule> {
        self.active_rule.and_then(|i| self.style.rules.get(i))
    }

    pub fn active_rule_mut(&mut self) -> Option<&mut Rule> {
        self.active_rule.and_then(|i| self.style.rules.get_mut(i))
    }

    /// Editor for the active rule, recomputed from its current symbolizers
    pub fn active_editor(&self) -> Option<EditorKind> {
        self.active_rule().map(editor_for)
    }

    /// Rename the active rule; names stay unique within the style
    pub fn rename_active_rule(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let index = self.active_rule.ok_or(StyleError::NoActiveRule)?;
        if self.style.rules.iter().enumerate().any(|(i, r)| i != index && r.name == name) {
            return Err(StyleError::DuplicateRuleName(name));
        }
        self.style.rules[index].name = name;
        Ok(())
    }

    /// Swap rule `index` with its neighbor. No-op at the boundaries.
    pub fn move_rule(&mut self, index: usize, direction: MoveDirection) -> bool {
        let len = self.style.rules.len();
        let target = match direction {
            MoveDirection::Up if index > 0 && index < len => index - 1,
            MoveDirection::Down if index + 1 < len => index + 1,
            _ => return false,
        };

        self.style.rules.swap(index, target);
        self.active_rule = self.active_rule.map(|active| {
            if active == index {
                target
            } else if active == target {
                index
            } else {
                active
            }
        });
        debug!(from = index, to = target, "rule moved");
        true
    }

    /// Remove rule `index`, clearing the active reference if it pointed there
    pub fn delete_rule(&mut self, index: usize) -> Option<Rule> {
        if index >= self.style.rules.len() {
            return None;
        }
        let removed = self.style.rules.remove(index);

        match self.active_rule {
            Some(active) if active == index => self.deselect_rule(),
            Some(active) if active > index => self.active_rule = Some(active - 1),
            _ => {}
        }
        debug!(index, rule = %removed.name, "rule deleted");
        Some(removed)
    }

    pub fn delete_all_rules(&mut self) {
        info!(count = self.style.rules.len(), "deleting all rules");
        self.style.rules.clear();
        self.deselect_rule();
    }

    // ------------------------------------------------------------------
    // Symbolizers
    // ------------------------------------------------------------------

    /// Append a default symbolizer to the active rule and select it.
    /// Returns its index, or `None` when no rule is active.
    pub fn add_symbolizer(&mut self, kind: SymbolizerKind) -> Option<usize> {
        let symbolizer = self.config.symbolizers.symbolizer(kind);
        let Some(rule) = self.active_rule_mut() else {
            warn!(kind = %kind, "no active rule, symbolizer not added");
            return None;
        };

        rule.symbolizers.push(symbolizer);
        let index = rule.symbolizers.len() - 1;
        self.active_symbolizer = Some(index);
        Some(index)
    }

    pub fn remove_symbolizer(&mut self, index: usize) -> Option<Symbolizer> {
        let rule = self.active_rule_mut()?;
        if index >= rule.symbolizers.len() {
            return None;
        }
        let removed = rule.symbolizers.remove(index);

        self.active_symbolizer = match self.active_symbolizer {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        Some(removed)
    }

    pub fn select_symbolizer(&mut self, index: usize) -> bool {
        let exists = self
            .active_rule()
            .is_some_and(|rule| index < rule.symbolizers.len());
        if exists {
            self.active_symbolizer = Some(index);
        }
        exists
    }

    pub fn active_symbolizer_index(&self) -> Option<usize> {
        self.active_symbolizer
    }

    pub fn active_symbolizer(&self) -> Option<&Symbolizer> {
        let index = self.active_symbolizer?;
        self.active_rule()?.symbolizers.get(index)
    }

    pub fn active_symbolizer_mut(&mut self) -> Option<&mut Symbolizer> {
        let index = self.active_symbolizer?;
        self.active_rule_mut()?.symbolizers.get_mut(index)
    }

    // ------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------

    pub fn filter_editor(&self) -> &FilterEditor {
        &self.filter
    }

    pub fn filter_editor_mut(&mut self) -> &mut FilterEditor {
        &mut self.filter
    }

    /// Write the filter editor's expression onto the active rule.
    ///
    /// An empty row list stores the null filter.
    pub fn commit_filter(&mut self) -> Result<Option<String>> {
        let expression = self.filter.expression();
        let rule = self.active_rule_mut().ok_or(StyleError::NoActiveRule)?;
        rule.filter = expression.clone();
        debug!(rule = %rule.name, filter = ?expression, "filter committed");
        Ok(expression)
    }

    // ------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------

    pub fn stage_classification(&mut self, request: ClassificationRequest) {
        self.staged = Some(request);
    }

    pub fn staged_classification(&self) -> Option<&ClassificationRequest> {
        self.staged.as_ref()
    }

    pub fn staged_classification_mut(&mut self) -> Option<&mut ClassificationRequest> {
        self.staged.as_mut()
    }

    /// Send the staged request to `classifier` and install its rules.
    /// Returns the number of rules installed.
    pub fn apply_classification(&mut self, classifier: &dyn Classifier) -> Result<usize> {
        let request = self.staged.as_ref().ok_or_else(|| {
            StyleError::ClassificationFailed("no classification staged".to_string())
        })?;

        let rules = classifier.classify(request)?;
        let count = rules.len();
        self.install_rules(rules);
        self.staged = None;
        Ok(count)
    }

    /// Replace every rule with `rules`, as returned by the classifier
    pub fn install_rules(&mut self, rules: Vec<Rule>) {
        info!(count = rules.len(), "installing rules");
        self.style.rules = rules;
        self.deselect_rule();
    }

    /// Validate the current style before handing it to storage
    pub fn validate(&self) -> Result<()> {
        validate(&self.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Comparator, Connective};
    use crate::registry::filter_session::FilterMode;

    fn editor_with(names: &[&str]) -> StyleEditor {
        let mut style = Style::new("test");
        style.rules = names.iter().map(|n| Rule::new(*n)).collect();
        StyleEditor::new(style)
    }

    fn names(editor: &StyleEditor) -> Vec<&str> {
        editor.rules().iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_add_manual_rule() {
        let mut editor = editor_with(&["Rule 1", "Rule 3"]);
        let outcome = editor.add_rule(RuleKind::Manual);

        assert_eq!(
            outcome,
            AddRuleOutcome::Created {
                index: 2,
                editor: EditorKind::Generic
            }
        );
        let rule = editor.active_rule().unwrap();
        assert_eq!(rule.name, "Rule 2");
        assert!(rule.symbolizers.is_empty());
        assert!(rule.filter.is_none());
    }

    #[test]
    fn test_add_raster_rules() {
        let mut editor = editor_with(&[]);

        let palette = editor.add_rule(RuleKind::RasterPalette);
        assert!(matches!(
            palette,
            AddRuleOutcome::Created {
                editor: EditorKind::RasterPalette,
                ..
            }
        ));

        let cell = editor.add_rule(RuleKind::RasterCell);
        assert!(matches!(
            cell,
            AddRuleOutcome::Created {
                editor: EditorKind::RasterCell,
                ..
            }
        ));
        match &editor.active_rule().unwrap().symbolizers[..] {
            [Symbolizer::RasterCell(cell)] => {
                assert_eq!(cell.point.shape, "circle");
                assert_eq!(cell.text.label.as_deref(), Some("value"));
            }
            other => panic!("Unexpected symbolizers: {:?}", other),
        }
    }

    #[test]
    fn test_auto_kinds_stage_only() {
        let mut editor = editor_with(&["a"]);
        assert_eq!(editor.add_rule(RuleKind::AutoInterval), AddRuleOutcome::Staged);
        assert_eq!(editor.rules().len(), 1);

        let staged = editor.staged_classification().unwrap();
        assert_eq!(staged.interval_count, Some(5));
        assert_eq!(staged.colors.len(), 5);

        editor.add_rule(RuleKind::AutoUnique);
        assert_eq!(editor.staged_classification().unwrap().interval_count, None);
    }

    #[test]
    fn test_apply_classification_replaces_rules() {
        let mut editor = editor_with(&["old"]);
        editor.select_rule(0);
        editor.add_rule(RuleKind::AutoInterval);
        editor.staged_classification_mut().unwrap().attribute = "pop".to_string();

        let classifier = |request: &ClassificationRequest| -> Result<Vec<Rule>> {
            let count = request.interval_count.unwrap_or(1);
            Ok((0..count)
                .map(|i| {
                    let mut rule = Rule::new(format!("{} {}", request.attribute, i));
                    rule.filter = Some(format!("{} >= {}", request.attribute, i * 10));
                    rule
                })
                .collect())
        };

        assert_eq!(editor.apply_classification(&classifier), Ok(5));
        assert_eq!(editor.rules()[0].name, "pop 0");
        assert!(editor.active_rule().is_none());
        assert!(editor.staged_classification().is_none());

        // Nothing staged any more
        assert!(matches!(
            editor.apply_classification(&classifier),
            Err(StyleError::ClassificationFailed(_))
        ));
    }

    #[test]
    fn test_classifier_error_keeps_rules() {
        let mut editor = editor_with(&["keep"]);
        editor.add_rule(RuleKind::AutoUnique);
        let failing = |_: &ClassificationRequest| -> Result<Vec<Rule>> {
            Err(StyleError::ClassificationFailed("service unavailable".to_string()))
        };

        assert!(editor.apply_classification(&failing).is_err());
        assert_eq!(names(&editor), vec!["keep"]);
        assert!(editor.staged_classification().is_some());
    }

    #[test]
    fn test_move_rule_up_swaps() {
        let mut editor = editor_with(&["a", "b", "c"]);
        assert!(editor.move_rule(1, MoveDirection::Up));
        assert_eq!(names(&editor), vec!["b", "a", "c"]);

        assert!(!editor.move_rule(0, MoveDirection::Up));
        assert!(!editor.move_rule(2, MoveDirection::Down));
        assert!(!editor.move_rule(7, MoveDirection::Up));
        assert_eq!(names(&editor), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_move_keeps_active_rule() {
        let mut editor = editor_with(&["a", "b", "c"]);
        editor.select_rule(1);
        editor.move_rule(1, MoveDirection::Down);
        assert_eq!(editor.active_rule().unwrap().name, "b");

        editor.move_rule(1, MoveDirection::Down);
        assert_eq!(editor.active_index(), Some(1));
        assert_eq!(editor.active_rule().unwrap().name, "b");
    }

    #[test]
    fn test_delete_active_rule_clears_selection() {
        let mut editor = editor_with(&["a", "b"]);
        editor.select_rule(1);
        editor.add_symbolizer(SymbolizerKind::Point);

        let removed = editor.delete_rule(1).unwrap();
        assert_eq!(removed.name, "b");
        assert!(editor.active_rule().is_none());
        assert!(editor.active_symbolizer().is_none());

        // Symbolizer edits need a new selection
        assert_eq!(editor.add_symbolizer(SymbolizerKind::Line), None);
        assert!(editor.rules()[0].symbolizers.is_empty());
    }

    #[test]
    fn test_delete_earlier_rule_shifts_selection() {
        let mut editor = editor_with(&["a", "b", "c"]);
        editor.select_rule(2);
        editor.delete_rule(0);
        assert_eq!(editor.active_index(), Some(1));
        assert_eq!(editor.active_rule().unwrap().name, "c");
        assert!(editor.delete_rule(5).is_none());
    }

    #[test]
    fn test_delete_all_rules() {
        let mut editor = editor_with(&["a", "b"]);
        editor.select_rule(0);
        editor.delete_all_rules();
        assert!(editor.rules().is_empty());
        assert!(editor.active_rule().is_none());
    }

    #[test]
    fn test_symbolizer_add_remove() {
        let mut editor = editor_with(&["a"]);
        editor.select_rule(0);

        assert_eq!(editor.add_symbolizer(SymbolizerKind::Polygon), Some(0));
        assert_eq!(editor.add_symbolizer(SymbolizerKind::Text), Some(1));
        assert_eq!(editor.active_symbolizer().unwrap().kind(), SymbolizerKind::Text);

        let removed = editor.remove_symbolizer(0).unwrap();
        assert_eq!(removed.kind(), SymbolizerKind::Polygon);
        assert_eq!(editor.active_symbolizer_index(), Some(0));
        assert_eq!(editor.active_symbolizer().unwrap().kind(), SymbolizerKind::Text);

        assert!(editor.remove_symbolizer(0).is_some());
        assert!(editor.active_symbolizer().is_none());
        assert!(editor.remove_symbolizer(0).is_none());
        assert!(!editor.select_symbolizer(0));
    }

    #[test]
    fn test_editor_route_follows_content() {
        let mut editor = editor_with(&["a"]);
        assert_eq!(editor.select_rule(0), Some(EditorKind::Generic));

        editor.add_symbolizer(SymbolizerKind::RasterPalette);
        assert_eq!(editor.active_editor(), Some(EditorKind::RasterPalette));

        editor.add_symbolizer(SymbolizerKind::RasterCell);
        assert_eq!(editor.active_editor(), Some(EditorKind::RasterCell));

        editor.remove_symbolizer(1);
        assert_eq!(editor.active_editor(), Some(EditorKind::RasterPalette));
        assert_eq!(editor.select_rule(3), None);
    }

    #[test]
    fn test_filter_round_trip_through_rule() {
        let mut editor = editor_with(&["a"]);
        editor.select_rule(0);
        {
            let rows = editor.filter_editor_mut().rows_mut();
            let first = rows.get_mut(0).unwrap();
            first.attribute = "name".to_string();
            first.value = "O'Brien".to_string();
            first.connective = Connective::And;
            let second = rows.append_row();
            let second = rows.get_mut(second).unwrap();
            second.attribute = "pop".to_string();
            second.comparator = Comparator::Gt;
            second.value = "5".to_string();
        }

        assert_eq!(
            editor.commit_filter().unwrap().as_deref(),
            Some("name = 'O\\'Brien' AND pop > '5'")
        );

        editor.deselect_rule();
        editor.select_rule(0);
        let rows = editor.filter_editor().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.get(0).unwrap().value, "O'Brien");
    }

    #[test]
    fn test_unparseable_filter_opens_raw_text() {
        let mut editor = editor_with(&["a"]);
        let text = "a = '1' AND (b = '2' AND c = '3')";
        editor.style.rules[0].filter = Some(text.to_string());

        editor.select_rule(0);
        assert_eq!(
            editor.filter_editor().mode(),
            &FilterMode::RawText(text.to_string())
        );

        // Committing without edits keeps the stored text
        assert_eq!(editor.commit_filter().unwrap().as_deref(), Some(text));
    }

    #[test]
    fn test_quoted_between_bounds_keep_filter() {
        let mut editor = editor_with(&["pop", "dates"]);
        let pop = "pop BETWEEN '1,5' AND '2'";
        let dates = "d BETWEEN '2020-01-01 00:00' AND '2021-01-01 00:00'";
        editor.style.rules[0].filter = Some(pop.to_string());
        editor.style.rules[1].filter = Some(dates.to_string());

        for (index, text) in [(0, pop), (1, dates)] {
            editor.select_rule(index);
            assert_eq!(
                editor.filter_editor().mode(),
                &FilterMode::RawText(text.to_string())
            );
            assert_eq!(editor.commit_filter().unwrap().as_deref(), Some(text));
            assert_eq!(editor.rules()[index].filter.as_deref(), Some(text));
        }
    }

    #[test]
    fn test_backslash_value_through_rule() {
        let mut editor = editor_with(&["a"]);
        editor.select_rule(0);
        {
            let row = editor.filter_editor_mut().rows_mut().get_mut(0).unwrap();
            row.attribute = "path".to_string();
            row.value = "C:\\".to_string();
        }
        let text = editor.commit_filter().unwrap().unwrap();
        assert_eq!(text, "path = 'C:\\'");

        editor.deselect_rule();
        editor.select_rule(0);
        assert!(!editor.filter_editor().is_raw());
        assert_eq!(editor.filter_editor().rows().get(0).unwrap().value, "C:\\");
    }

    #[test]
    fn test_commit_empty_rows_clears_filter() {
        let mut editor = editor_with(&["a"]);
        editor.style.rules[0].filter = Some("a = '1'".to_string());
        editor.select_rule(0);
        editor.filter_editor_mut().rows_mut().get_mut(0).unwrap().attribute.clear();

        assert_eq!(editor.commit_filter().unwrap(), None);
        assert!(editor.rules()[0].filter.is_none());

        editor.deselect_rule();
        assert_eq!(editor.commit_filter(), Err(StyleError::NoActiveRule));
    }

    #[test]
    fn test_rename_active_rule() {
        let mut editor = editor_with(&["a", "b"]);
        assert_eq!(editor.rename_active_rule("x"), Err(StyleError::NoActiveRule));

        editor.select_rule(0);
        assert_eq!(
            editor.rename_active_rule("b"),
            Err(StyleError::DuplicateRuleName("b".to_string()))
        );
        editor.rename_active_rule("a2").unwrap();
        assert_eq!(names(&editor), vec!["a2", "b"]);
        assert!(editor.validate().is_ok());
    }
}
