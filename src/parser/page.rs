//! Page tree traversal with inherited attributes.

use std::collections::HashSet;

use super::object::{Dict, ObjRef, PdfValue};
use super::store::ObjectStore;
use crate::error::ParseError;

/// Page trees deeper than this are treated as malformed.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when no `/MediaBox` is found.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// An axis-aligned rectangle in PDF user space (points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    /// Build from a four-number array, normalising corner order.
    pub fn from_array(values: &[PdfValue]) -> Option<Self> {
        let nums: Vec<f64> = values.iter().filter_map(PdfValue::as_f64).collect();
        if nums.len() != 4 {
            return None;
        }
        let rect = Self {
            x0: nums[0].min(nums[2]),
            y0: nums[1].min(nums[3]),
            x1: nums[0].max(nums[2]),
            y1: nums[1].max(nums[3]),
        };
        (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// A leaf of the page tree with inheritance applied.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based position in document order
    pub index: usize,
    /// Indirect reference of the page object, when it has one
    pub id: Option<ObjRef>,
    /// The page dictionary itself
    pub dict: Dict,
    /// Effective `/Resources`
    pub resources: Dict,
    /// Effective `/MediaBox`
    pub media_box: Rect,
    /// Effective `/CropBox`, falling back to the media box
    pub crop_box: Rect,
    /// Effective `/Rotate`, normalised to 0, 90, 180 or 270
    pub rotate: i64,
}

impl Page {
    /// Page size after rotation, in points.
    pub fn display_size(&self) -> (f64, f64) {
        let (w, h) = (self.crop_box.width(), self.crop_box.height());
        if self.rotate % 180 == 90 {
            (h, w)
        } else {
            (w, h)
        }
    }
}

#[derive(Clone, Default)]
struct Inherited {
    resources: Option<Dict>,
    media_box: Option<Rect>,
    crop_box: Option<Rect>,
    rotate: Option<i64>,
}

impl ObjectStore {
    /// All pages in document order.
    ///
    /// Kids that cannot be resolved and nodes reached twice are skipped with
    /// a warning; only a missing or unusable root is an error.
    pub fn pages(&self) -> Result<Vec<Page>, ParseError> {
        let catalog = self.catalog()?;
        let root_value = catalog
            .get("Pages")
            .ok_or_else(|| ParseError::InvalidPageTree("catalog has no /Pages".into()))?;
        let root = self.deref(root_value)?;
        let root_dict = root
            .as_dict()
            .ok_or_else(|| ParseError::InvalidPageTree("/Pages is not a dictionary".into()))?
            .clone();

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        if let Some(id) = root_value.as_reference() {
            visited.insert(id);
        }
        // Depth-first, children pushed in reverse so they pop in order.
        let mut stack = vec![(root_value.as_reference(), root_dict, Inherited::default(), 0usize)];

        while let Some((id, node, inherited, depth)) = stack.pop() {
            let inherited = self.inherit(&node, inherited);

            let is_page = node.has_type("Page") || (!node.has_type("Pages") && !node.contains_key("Kids"));
            if is_page {
                pages.push(self.make_page(pages.len(), id, node, &inherited));
                continue;
            }

            if depth >= MAX_TREE_DEPTH {
                log::warn!("page tree deeper than {} levels, pruning", MAX_TREE_DEPTH);
                continue;
            }

            let kids = self
                .get(&node, "Kids")
                .and_then(|k| k.as_array().map(<[PdfValue]>::to_vec))
                .unwrap_or_default();

            for kid in kids.iter().rev() {
                let kid_id = kid.as_reference();
                if let Some(kid_id) = kid_id {
                    if !visited.insert(kid_id) {
                        log::warn!("page tree cycle at {}, skipping", kid_id);
                        continue;
                    }
                }
                match self.deref(kid) {
                    Ok(PdfValue::Dictionary(dict)) => {
                        stack.push((kid_id, dict, inherited.clone(), depth + 1));
                    }
                    Ok(other) => log::warn!("page tree kid is a {}, skipping", other.type_name()),
                    Err(e) => log::warn!("cannot resolve page tree kid: {}", e),
                }
            }
        }

        log::debug!("page tree has {} pages", pages.len());
        Ok(pages)
    }

    fn inherit(&self, node: &Dict, mut inherited: Inherited) -> Inherited {
        if let Some(resources) = self.get_dict(node, "Resources") {
            inherited.resources = Some(resources);
        }
        if let Some(rect) = self.rect(node, "MediaBox") {
            inherited.media_box = Some(rect);
        }
        if let Some(rect) = self.rect(node, "CropBox") {
            inherited.crop_box = Some(rect);
        }
        if let Some(rotate) = self.get(node, "Rotate").and_then(|r| r.as_i64()) {
            inherited.rotate = Some(rotate);
        }
        inherited
    }

    fn rect(&self, dict: &Dict, key: &str) -> Option<Rect> {
        let value = self.get(dict, key)?;
        let items: Vec<PdfValue> = value
            .as_array()?
            .iter()
            .map(|v| self.deref(v).unwrap_or(PdfValue::Null))
            .collect();
        Rect::from_array(&items)
    }

    fn make_page(&self, index: usize, id: Option<ObjRef>, dict: Dict, inherited: &Inherited) -> Page {
        let media_box = inherited.media_box.unwrap_or(DEFAULT_MEDIA_BOX);
        Page {
            index,
            id,
            dict,
            resources: inherited.resources.clone().unwrap_or_default(),
            media_box,
            crop_box: inherited.crop_box.unwrap_or(media_box),
            rotate: inherited.rotate.unwrap_or(0).rem_euclid(360) / 90 * 90,
        }
    }

    /// Concatenated, decoded content streams of `page`.
    pub fn page_content(&self, page: &Page) -> Result<Vec<u8>, ParseError> {
        let Some(contents) = page.dict.get("Contents") else {
            return Ok(Vec::new());
        };
        let parts = match self.deref(contents)? {
            PdfValue::Array(items) => items,
            other => vec![other],
        };

        let mut out = Vec::new();
        for part in parts {
            match self.deref(&part)? {
                PdfValue::Stream(stream) => {
                    out.extend_from_slice(&self.decode_stream(&stream)?);
                    // Streams may split a token; the separator keeps them apart.
                    out.push(b'\n');
                }
                PdfValue::Null => {}
                other => log::warn!("content entry is a {}, ignoring", other.type_name()),
            }
        }
        Ok(out)
    }
}
