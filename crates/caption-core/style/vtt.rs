//! WebVTT styling: `STYLE` blocks with `::cue` rules and cue text tags
//!
//! Identifiers used in `::cue(#id)` selectors are rewritten to document
//! scoped `styleN` ids when read, through [`VttIdentifiers`], and restored
//! when written. Span attributes that no stylesheet rule explains are
//! written as synthesized classes with the [`SYNTHESIZED_CLASS_PREFIX`]
//! prefix; those classes and their rules are folded back into attributes
//! on read, so a written file reads back to the same document.

use std::cell::RefCell;

use super::css::{
    self, apply_declarations, cue_targets, declarations_for, format_stylesheet, parse_stylesheet,
    CssRule, CueTarget,
};
use super::markup::{build_styled, emit_nested, escape_entities, tokenize, unescape_entities, TagPair};
use crate::model::options::MICRO_DVD_CLASS_PREFIX;
use crate::model::{SpanStyle, StyledText, TextFlags, VttIdentifiers};
use crate::utils::HashMap;

/// Prefix of classes generated for attributes without a matching rule
pub const SYNTHESIZED_CLASS_PREFIX: &str = "caption-style-";

/// Extra key holding a `<v>` voice name
pub const VOICE_KEY: &str = "vtt:voice";

/// Extra key holding a `<lang>` language
pub const LANG_KEY: &str = "vtt:lang";

type Declarations = Vec<(String, String)>;

/// `::cue` rules indexed by what they select
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VttStyleRules {
    all: Declarations,
    ids: HashMap<String, Declarations>,
    classes: HashMap<String, Declarations>,
}

impl VttStyleRules {
    /// Rules of one stylesheet
    #[must_use]
    pub fn from_css(text: &str) -> Self {
        let mut rules = Self::default();
        rules.add_css(text);
        rules
    }

    /// Add the rules of another stylesheet; later rules win
    pub fn add_css(&mut self, text: &str) {
        for rule in parse_stylesheet(text) {
            self.add_rule(&rule);
        }
    }

    /// Add every rule of `other` after the existing ones
    pub fn merge(&mut self, other: Self) {
        self.all.extend(other.all);
        for (id, declarations) in other.ids {
            self.ids.entry(id).or_default().extend(declarations);
        }
        for (class, declarations) in other.classes {
            self.classes.entry(class).or_default().extend(declarations);
        }
    }

    fn add_rule(&mut self, rule: &CssRule) {
        for target in cue_targets(&rule.selector) {
            let slot = match target {
                CueTarget::All => &mut self.all,
                CueTarget::Id(id) => self.ids.entry(id.to_string()).or_default(),
                CueTarget::Class(class) => self.classes.entry(class.to_string()).or_default(),
                CueTarget::Other(selector) => {
                    log::debug!("Ignoring VTT selector {selector}");
                    continue;
                }
            };
            slot.extend(rule.declarations.iter().cloned());
        }
    }

    /// Style every span of the cue with identifier `cue_id` starts from
    ///
    /// `cue_id` is the rewritten identifier.
    #[must_use]
    pub fn base_style(&self, cue_id: Option<&str>) -> SpanStyle {
        let mut style = SpanStyle::plain();
        apply_declarations(&mut style, &self.all);
        if let Some(declarations) = cue_id.and_then(|id| self.ids.get(id)) {
            apply_declarations(&mut style, declarations);
        }
        style
    }

    /// `base` with the rules of `class` applied
    #[must_use]
    pub fn with_class(&self, base: &SpanStyle, class: &str) -> SpanStyle {
        let mut style = base.clone();
        if let Some(declarations) = self.classes.get(class) {
            apply_declarations(&mut style, declarations);
        }
        style
    }
}

fn is_synthesized(selector: &str) -> bool {
    let targets = cue_targets(selector);
    !targets.is_empty()
        && targets.iter().all(|target| {
            matches!(target, CueTarget::Class(class) if class.starts_with(SYNTHESIZED_CLASS_PREFIX))
        })
}

/// Rewrite a source `STYLE` block for storage in a document
///
/// Returns the stylesheet with `#id` selectors rewritten (empty when only
/// synthesized rules were present) and the rules to resolve cue text with,
/// synthesized ones included.
pub fn read_stylesheet(text: &str, identifiers: &mut VttIdentifiers) -> (String, VttStyleRules) {
    let mut stored = Vec::new();
    let mut resolved = VttStyleRules::default();
    for rule in parse_stylesheet(text) {
        if is_synthesized(&rule.selector) {
            resolved.add_rule(&rule);
            continue;
        }
        let rule = CssRule {
            selector: css::rename_selector_ids(&rule.selector, |id| Some(identifiers.rewrite(id))),
            declarations: rule.declarations,
        };
        resolved.add_rule(&rule);
        stored.push(rule);
    }
    (format_stylesheet(&stored), resolved)
}

/// Restore source identifiers in a stored stylesheet
#[must_use]
pub fn write_stylesheet(text: &str, identifiers: &VttIdentifiers) -> String {
    css::rename_ids(text, |id| Some(identifiers.original(id).to_string()))
}

/// Parse VTT cue text
///
/// `base` comes from [`VttStyleRules::base_style`]. Classes pick up their
/// rules from `rules`; synthesized classes are resolved and then dropped.
#[must_use]
pub fn from_vtt(text: &str, base: SpanStyle, rules: &VttStyleRules) -> StyledText {
    build_styled(
        &tokenize(text),
        base,
        |tag, current| {
            let mut style = current.clone();
            match tag.name.as_str() {
                "b" => style.flags |= TextFlags::BOLD,
                "i" => style.flags |= TextFlags::ITALIC,
                "u" => style.flags |= TextFlags::UNDERLINE,
                "c" => {}
                "v" => {
                    if let Some(voice) = tag.annotation {
                        style.extra.insert(VOICE_KEY.to_string(), voice.to_string());
                    }
                }
                "lang" => {
                    if let Some(lang) = tag.annotation {
                        style.extra.insert(LANG_KEY.to_string(), lang.to_string());
                    }
                }
                _ => return None,
            }
            for class in &tag.classes {
                style = rules.with_class(&style, class);
                if !class.starts_with(SYNTHESIZED_CLASS_PREFIX) {
                    style = style.with_class(class);
                }
            }
            Some(style)
        },
        unescape_entities,
    )
}

/// Classes generated while writing one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesizedClasses {
    by_declarations: HashMap<String, String>,
    rules: Vec<CssRule>,
}

impl SynthesizedClasses {
    fn class_for(&mut self, declarations: Declarations) -> String {
        let key = css::format_declarations(&declarations);
        if let Some(class) = self.by_declarations.get(&key) {
            return class.clone();
        }
        let class = format!("{SYNTHESIZED_CLASS_PREFIX}{}", self.rules.len() + 1);
        self.by_declarations.insert(key, class.clone());
        self.rules.push(CssRule {
            selector: format!("::cue(.{class})"),
            declarations,
        });
        class
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Stylesheet defining every generated class
    #[must_use]
    pub fn stylesheet(&self) -> String {
        format_stylesheet(&self.rules)
    }
}

/// Declarations of `style` that `implied` does not already produce
fn residual(style: &SpanStyle, implied: &SpanStyle) -> Declarations {
    let mut wanted = style.clone();
    // Tags cover these
    wanted.flags.remove(TextFlags::BOLD | TextFlags::ITALIC | TextFlags::UNDERLINE);
    let mut baseline = implied.clone();
    baseline.flags.remove(TextFlags::BOLD | TextFlags::ITALIC | TextFlags::UNDERLINE);

    let baseline: Declarations = declarations_for(&baseline);
    declarations_for(&wanted)
        .into_iter()
        .filter(|declaration| !baseline.contains(declaration))
        .collect()
}

/// Render styled text as VTT cue text
///
/// `base` is the style the cue's `::cue` and `::cue(#id)` rules give every
/// span. Attributes beyond what `base` and the span's classes produce get a
/// class from `synthesized`.
pub fn to_vtt(
    text: &StyledText,
    base: &SpanStyle,
    rules: &VttStyleRules,
    synthesized: &mut SynthesizedClasses,
) -> String {
    let synthesized = RefCell::new(synthesized);
    emit_nested(
        text.segments(),
        |style| {
            let classes: Vec<&str> = style
                .classes
                .iter()
                .map(String::as_str)
                .filter(|class| !class.starts_with(MICRO_DVD_CLASS_PREFIX))
                .collect();
            let mut implied = base.clone();
            for class in &classes {
                implied = rules.with_class(&implied, class);
            }
            implied.extra.remove(VOICE_KEY);
            implied.extra.remove(LANG_KEY);
            let mut own = style.clone();
            own.classes.clear();
            own.extra.remove(VOICE_KEY);
            own.extra.remove(LANG_KEY);

            let mut tags = Vec::new();
            if let Some(voice) = style.extra.get(VOICE_KEY) {
                tags.push(TagPair::new(format!("<v {voice}>"), "</v>"));
            }
            if let Some(lang) = style.extra.get(LANG_KEY) {
                tags.push(TagPair::new(format!("<lang {lang}>"), "</lang>"));
            }
            let mut class_list: Vec<String> = classes.iter().map(|c| (*c).to_string()).collect();
            let extra = residual(&own, &implied);
            if !extra.is_empty() {
                class_list.push(synthesized.borrow_mut().class_for(extra));
            }
            if !class_list.is_empty() {
                tags.push(TagPair::new(format!("<c.{}>", class_list.join(".")), "</c>"));
            }
            let tag_flags = own.flags - implied.flags;
            for (flag, name) in [
                (TextFlags::BOLD, "b"),
                (TextFlags::ITALIC, "i"),
                (TextFlags::UNDERLINE, "u"),
            ] {
                if tag_flags.contains(flag) {
                    tags.push(TagPair::new(format!("<{name}>"), format!("</{name}>")));
                }
            }
            tags
        },
        escape_entities,
        "\n",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Color;

    #[test]
    fn stylesheet_ids_are_rewritten_and_restored() {
        let mut ids = VttIdentifiers::default();
        let (stored, _) = read_stylesheet("::cue(#intro) { color: red }\n::cue(#outro) { color: blue }", &mut ids);
        assert!(stored.contains("::cue(#style1)"));
        assert!(stored.contains("::cue(#style2)"));
        let written = write_stylesheet(&stored, &ids);
        assert!(written.contains("::cue(#intro)"));
        assert!(written.contains("::cue(#outro)"));
    }

    #[test]
    fn classes_resolve_to_attributes() {
        let rules = VttStyleRules::from_css("::cue(.yellow) { color: yellow }");
        let text = from_vtt("<c.yellow>warn</c> <b>bold</b>", SpanStyle::plain(), &rules);
        let segments = text.segments();
        let crate::model::Segment::Text { style, .. } = &segments[0] else {
            panic!("expected text");
        };
        assert_eq!(style.color, Some(Color::new(255, 255, 0)));
        assert_eq!(style.classes, ["yellow"]);
    }

    #[test]
    fn class_markup_round_trips_without_synthesis() {
        let rules = VttStyleRules::from_css("::cue(.yellow) { color: yellow }");
        let source = "<c.yellow>warn</c> <i>soft</i> &amp; <v Roger>hi</v>";
        let text = from_vtt(source, SpanStyle::plain(), &rules);
        let mut synthesized = SynthesizedClasses::default();
        assert_eq!(to_vtt(&text, &SpanStyle::plain(), &rules, &mut synthesized), source);
        assert!(synthesized.is_empty());
    }

    #[test]
    fn unexplained_colour_is_synthesized() {
        let mut text = StyledText::new();
        text.push_text("red", SpanStyle::plain().with_color(Color::new(255, 0, 0)));
        let rules = VttStyleRules::default();
        let mut synthesized = SynthesizedClasses::default();
        let cue = to_vtt(&text, &SpanStyle::plain(), &rules, &mut synthesized);
        assert_eq!(cue, "<c.caption-style-1>red</c>");

        let mut ids = VttIdentifiers::default();
        let (stored, resolved) = read_stylesheet(&synthesized.stylesheet(), &mut ids);
        assert!(stored.is_empty());
        let back = from_vtt(&cue, SpanStyle::plain(), &resolved);
        assert_eq!(back, text);
    }
}
