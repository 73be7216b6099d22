//! Document aggregate

use core::ops::Index;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::block::{Block, BlockBody, BlockKind, StyleContent};
use super::options::DocumentOptions;
use crate::formats::FileExtensions;
use crate::style::css;
use crate::time::MicroTime;
use crate::utils::{normalize_language, CoreError, Result, UNDEFINED_LANGUAGE};

/// Ordered blocks plus file level state
///
/// The document owns its blocks exclusively. Every mutation keeps two
/// invariants: `time_length` is the largest block end time, and the style,
/// layout and metadata indices in [`DocumentOptions`] point at blocks of the
/// matching kind.
///
/// # Example
///
/// ```rust
/// use caption_core::{Block, Document, MicroTime, StyledText};
///
/// let mut document = Document::new("en");
/// document.append(
///     Block::caption(MicroTime::from_millis(1_000), MicroTime::from_millis(2_500))
///         .with_text("en", StyledText::from_plain("Hello")),
/// );
/// assert_eq!(document.len(), 1);
/// assert_eq!(document.time_length(), MicroTime::from_millis(2_500));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Document {
    default_language: String,
    time_length: MicroTime,
    /// Name of the file the document was read from
    pub filename: Option<String>,
    /// Extension table used for dispatch and filename generation
    #[cfg_attr(feature = "serde", serde(default))]
    pub extensions: FileExtensions,
    #[cfg_attr(feature = "serde", serde(default))]
    pub options: DocumentOptions,
    block_list: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(UNDEFINED_LANGUAGE)
    }
}

impl Document {
    /// Empty document whose primary language is `default_language`
    ///
    /// Invalid tags degrade to `und`.
    #[must_use]
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: normalize_language(default_language),
            time_length: MicroTime::ZERO,
            filename: None,
            extensions: FileExtensions::default(),
            options: DocumentOptions::default(),
            block_list: Vec::new(),
        }
    }

    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Change the primary language, normalising the tag
    pub fn set_default_language(&mut self, language: &str) {
        self.default_language = normalize_language(language);
    }

    /// End of the last block
    #[must_use]
    pub const fn time_length(&self) -> MicroTime {
        self.time_length
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.block_list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block_list.is_empty()
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.block_list
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.block_list.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Block> {
        self.block_list.iter()
    }

    /// Caption blocks only
    pub fn captions(&self) -> impl Iterator<Item = &Block> {
        self.block_list
            .iter()
            .filter(|block| block.kind() == BlockKind::Caption)
    }

    /// Blocks of one kind
    pub fn blocks_of(&self, kind: BlockKind) -> impl Iterator<Item = &Block> {
        self.block_list
            .iter()
            .filter(move |block| block.kind() == kind)
    }

    /// Every language used by a caption, in tag order
    #[must_use]
    pub fn languages(&self) -> BTreeSet<String> {
        self.captions()
            .filter_map(Block::as_caption)
            .flat_map(|caption| caption.languages().map(str::to_string))
            .collect()
    }

    /// Append a block at the end
    pub fn append(&mut self, block: Block) {
        let position = self.block_list.len();
        self.time_length = self.time_length.max(block.end_time());
        self.index_block(position, &block);
        self.block_list.push(block);
    }

    /// Append every block of `blocks` in order
    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) {
        for block in blocks {
            self.append(block);
        }
    }

    /// Insert a block before `index`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfBounds`] when `index > len`.
    pub fn insert(&mut self, index: usize, block: Block) -> Result<()> {
        if index > self.block_list.len() {
            return Err(self.out_of_bounds(index));
        }
        self.block_list.insert(index, block);
        self.refresh();
        Ok(())
    }

    /// Remove and return the block at `index`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfBounds`] when `index >= len`.
    pub fn remove(&mut self, index: usize) -> Result<Block> {
        if index >= self.block_list.len() {
            return Err(self.out_of_bounds(index));
        }
        let block = self.block_list.remove(index);
        self.refresh();
        Ok(block)
    }

    /// Swap two blocks
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfBounds`] when either index is invalid.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.block_list.len();
        if a >= len || b >= len {
            return Err(self.out_of_bounds(a.max(b)));
        }
        self.block_list.swap(a, b);
        self.refresh();
        Ok(())
    }

    /// Replace the block at `index`, returning the old one
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfBounds`] when `index >= len`.
    pub fn replace(&mut self, index: usize, block: Block) -> Result<Block> {
        let Some(slot) = self.block_list.get_mut(index) else {
            return Err(self.out_of_bounds(index));
        };
        let old = core::mem::replace(slot, block);
        self.refresh();
        Ok(old)
    }

    /// Edit the block at `index` in place
    ///
    /// Indices and `time_length` are brought up to date afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfBounds`] when `index >= len`.
    pub fn update<R>(&mut self, index: usize, edit: impl FnOnce(&mut Block) -> R) -> Result<R> {
        let Some(block) = self.block_list.get_mut(index) else {
            return Err(self.out_of_bounds(index));
        };
        let result = edit(block);
        self.refresh();
        Ok(result)
    }

    /// Keep only blocks matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&Block) -> bool) {
        self.block_list.retain(keep);
        self.refresh();
    }

    fn out_of_bounds(&self, index: usize) -> CoreError {
        CoreError::IndexOutOfBounds {
            index,
            len: self.block_list.len(),
        }
    }

    fn index_block(&mut self, position: usize, block: &Block) {
        let Some(id) = block.id() else {
            return;
        };
        let index = match block.kind() {
            BlockKind::Style => &mut self.options.style,
            BlockKind::Layout => &mut self.options.layout,
            BlockKind::Metadata => &mut self.options.metadata,
            BlockKind::Caption | BlockKind::Comment => return,
        };
        index.insert(id.to_string(), position);
    }

    /// Rebuild the secondary indices and `time_length` from the block list
    fn refresh(&mut self) {
        self.options.style.clear();
        self.options.layout.clear();
        self.options.metadata.clear();
        self.time_length = MicroTime::ZERO;
        let blocks = core::mem::take(&mut self.block_list);
        for (position, block) in blocks.iter().enumerate() {
            self.time_length = self.time_length.max(block.end_time());
            self.index_block(position, block);
        }
        self.block_list = blocks;
    }

    fn indexed(&self, index: &BTreeMap<String, usize>, id: &str) -> Option<&Block> {
        index.get(id).and_then(|&position| self.block_list.get(position))
    }

    /// Style block with `id`
    #[must_use]
    pub fn style(&self, id: &str) -> Option<&Block> {
        self.indexed(&self.options.style, id)
    }

    /// Layout block with `id`
    #[must_use]
    pub fn layout(&self, id: &str) -> Option<&Block> {
        self.indexed(&self.options.layout, id)
    }

    /// Metadata block with `id`
    #[must_use]
    pub fn metadata(&self, id: &str) -> Option<&Block> {
        self.indexed(&self.options.metadata, id)
    }

    /// Append an untimed metadata block
    pub fn add_metadata(&mut self, id: &str, entries: BTreeMap<String, String>) {
        self.append(Block::metadata(Some(id.to_string()), entries));
    }

    /// Move every block by a signed microsecond delta
    pub fn shift_time(&mut self, delta_micros: i64) {
        for block in &mut self.block_list {
            block.shift_time(delta_micros);
        }
        self.refresh();
    }

    /// Move every block start by a signed microsecond delta
    pub fn shift_start(&mut self, delta_micros: i64) {
        for block in &mut self.block_list {
            block.shift_start(delta_micros);
        }
        self.refresh();
    }

    /// Move every block end by a signed microsecond delta
    pub fn shift_end(&mut self, delta_micros: i64) {
        for block in &mut self.block_list {
            block.shift_end(delta_micros);
        }
        self.refresh();
    }

    /// Remove one language from every caption
    pub fn remove_language(&mut self, language: &str) {
        let language = normalize_language(language);
        for block in &mut self.block_list {
            if let Some(caption) = block.as_caption_mut() {
                caption.remove_language(&language);
            }
        }
    }

    /// Copy the languages of `other` into the captions of `self`
    ///
    /// Captions are paired by their position among caption blocks. Languages
    /// already present in `self` are left alone.
    pub fn merge_languages(&mut self, other: &Self) {
        let mut incoming = other.captions().filter_map(Block::as_caption);
        for block in &mut self.block_list {
            let Some(caption) = block.as_caption_mut() else {
                continue;
            };
            let Some(source) = incoming.next() else {
                break;
            };
            for (language, text) in &source.text_by_language {
                caption
                    .text_by_language
                    .entry(language.clone())
                    .or_insert_with(|| text.clone());
            }
        }
    }

    /// Append a copy of every block of `other`, shifted by `offset`
    ///
    /// With `add_end_time` the blocks are additionally shifted by this
    /// document's current `time_length`, placing `other` after it. MicroDVD
    /// classes and VTT identifiers of `other` are re-registered here so they
    /// cannot collide with existing ones.
    pub fn join(&mut self, other: &Self, add_end_time: bool, offset: MicroTime) {
        let base = if add_end_time {
            offset + self.time_length
        } else {
            offset
        };
        let delta = i64::try_from(base.as_micros()).unwrap_or(i64::MAX);

        let class_map: BTreeMap<String, String> = other
            .options
            .micro_dvd
            .classes
            .iter()
            .map(|(class, codes)| {
                (
                    class.clone(),
                    self.options.micro_dvd.register(codes.clone()),
                )
            })
            .collect();
        let id_map: BTreeMap<String, String> = other
            .options
            .vtt
            .identifier_to_original
            .iter()
            .map(|(rewritten, original)| (rewritten.clone(), self.options.vtt.rewrite(original)))
            .collect();

        if self.options.frame_rate.is_none() {
            self.options.frame_rate = other.options.frame_rate;
        }

        for block in &other.block_list {
            let mut block = block.clone();
            block.shift_time(delta);
            match &mut block.body {
                BlockBody::Caption(caption) if !class_map.is_empty() => {
                    for text in caption.text_by_language.values_mut() {
                        text.map_styles(|style| {
                            for class in &mut style.classes {
                                if let Some(renamed) = class_map.get(class) {
                                    class.clone_from(renamed);
                                }
                            }
                        });
                    }
                }
                BlockBody::Style(style) if !id_map.is_empty() => {
                    if let StyleContent::Css(text) = &mut style.content {
                        *text = css::rename_ids(text, |id| id_map.get(id).cloned());
                    }
                }
                _ => {}
            }
            self.append(block);
        }
    }
}

impl Index<usize> for Document {
    type Output = Block;

    fn index(&self, index: usize) -> &Block {
        &self.block_list[index]
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = core::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.block_list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StyledText, SpanStyle};

    fn ms(millis: u64) -> MicroTime {
        MicroTime::from_millis(millis)
    }

    fn caption(start: u64, end: u64, text: &str) -> Block {
        Block::caption(ms(start), ms(end)).with_text("en", StyledText::from_plain(text))
    }

    fn styled(id: &str) -> Block {
        Block::style(Some(id.to_string()), StyleContent::Raw(id.to_string()))
    }

    #[test]
    fn time_length_tracks_maximum_end() {
        let mut document = Document::new("en");
        document.append(caption(0, 5_000, "a"));
        document.append(caption(1_000, 2_000, "b"));
        assert_eq!(document.time_length(), ms(5_000));

        document.remove(0).unwrap();
        assert_eq!(document.time_length(), ms(2_000));
    }

    #[test]
    fn indices_follow_structural_edits() {
        let mut document = Document::new("en");
        document.append(styled("a"));
        document.append(caption(0, 1, "x"));
        document.append(styled("b"));
        assert_eq!(document.options.style_index()["b"], 2);

        document.insert(0, caption(0, 1, "y")).unwrap();
        assert_eq!(document.options.style_index()["a"], 1);
        assert_eq!(document.style("b").unwrap().id(), Some("b"));

        document.swap(1, 3).unwrap();
        assert_eq!(document.options.style_index()["a"], 3);
        assert_eq!(document.options.style_index()["b"], 1);

        document.remove(1).unwrap();
        assert!(document.style("b").is_none());
        assert_eq!(document.style("a").unwrap().id(), Some("a"));

        document.replace(2, caption(0, 1, "z")).unwrap();
        assert!(document.style("a").is_none());
        assert!(document.options.style_index().is_empty());
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut document = Document::new("en");
        assert!(matches!(
            document.remove(0),
            Err(CoreError::IndexOutOfBounds { index: 0, len: 0 })
        ));
        assert!(document.insert(2, caption(0, 1, "x")).is_err());
        assert!(document.swap(0, 1).is_err());
    }

    #[test]
    fn join_offsets_and_reallocates() {
        let mut first = Document::new("en");
        first.append(caption(0, 2_000, "one"));
        first.options.vtt.rewrite("speaker");

        let mut second = Document::new("en");
        let class = second
            .options
            .micro_dvd
            .register(vec![("P".to_string(), "0".to_string())]);
        let mut text = StyledText::new();
        text.push_text("two", SpanStyle::plain().with_class(&class));
        second.append(Block::caption(ms(0), ms(1_000)).with_text("en", text));
        let rewritten = second.options.vtt.rewrite("narrator");
        second.append(Block::style(
            None,
            StyleContent::Css(format!("::cue(#{rewritten}) {{ color: red }}")),
        ));

        first.join(&second, true, ms(500));
        assert_eq!(first.len(), 3);
        assert_eq!(first[1].start_time(), ms(2_500));
        assert_eq!(first.time_length(), ms(3_500));

        let BlockBody::Style(style) = &first[2].body else {
            panic!("expected style block");
        };
        let StyleContent::Css(css) = &style.content else {
            panic!("expected css");
        };
        let new_id = first.options.vtt.rewritten("narrator").unwrap();
        assert!(css.contains(&format!("#{new_id}")));
        assert_eq!(first.options.vtt.original(new_id), "narrator");
        assert_ne!(new_id, first.options.vtt.rewritten("speaker").unwrap());
    }

    #[test]
    fn language_operations() {
        let mut document = Document::new("EN");
        assert_eq!(document.default_language(), "en");
        document.set_default_language("bogus tag");
        assert_eq!(document.default_language(), "und");

        document.append(caption(0, 1, "hello"));
        let mut other = Document::new("fr");
        other.append(Block::caption(ms(0), ms(1)).with_text("fr", StyledText::from_plain("salut")));
        document.merge_languages(&other);
        assert_eq!(
            document.languages().into_iter().collect::<Vec<_>>(),
            ["en", "fr"]
        );

        document.remove_language("fr");
        assert!(document[0].text("fr").is_none());
    }

    #[test]
    fn shifts_recompute_length() {
        let mut document = Document::new("en");
        document.append(caption(1_000, 2_000, "a"));
        document.shift_time(1_000_000);
        assert_eq!(document.time_length(), ms(3_000));
        document.shift_end(-500_000);
        assert_eq!(document.time_length(), ms(2_500));
        document.shift_start(-5_000_000);
        assert_eq!(document[0].start_time(), MicroTime::ZERO);
    }
}
