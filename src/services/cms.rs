//! CMS pages built from typed blocks.
//!
//! A page holds an ordered list of blocks. `section` and `grid` blocks may
//! hold one level of child blocks; every other kind is a leaf. Block `data`
//! is a freeform JSON object edited per kind and read leniently by the
//! preview renderer.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{paths, Revalidator};
use crate::entities::cms_page;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::slug::SLUG_PATTERN;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BlockKind {
    Header,
    Section,
    Grid,
    Text,
    Cta,
}

impl BlockKind {
    pub fn accepts_children(self) -> bool {
        matches!(self, BlockKind::Section | BlockKind::Grid)
    }

    /// Starting data for a freshly added block
    pub fn default_data(self) -> Value {
        match self {
            BlockKind::Header => json!({ "title": "", "subtitle": "" }),
            BlockKind::Section => json!({ "title": "" }),
            BlockKind::Grid => json!({ "columns": 3 }),
            BlockKind::Text => json!({ "content": "" }),
            BlockKind::Cta => json!({ "label": "", "href": "", "text": "" }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    pub id: Uuid,
    pub kind: BlockKind,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<Block>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            data: kind.default_data(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Checks nesting, kinds and id uniqueness. Null data is normalized to `{}`.
pub fn validate_blocks(blocks: &mut [Block]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for block in blocks.iter_mut() {
        check_block(block, &mut seen)?;
        if !block.children.is_empty() && !block.kind.accepts_children() {
            return Err(ServiceError::ValidationError(format!(
                "{} blocks cannot contain other blocks",
                block.kind
            )));
        }
        for child in block.children.iter_mut() {
            check_block(child, &mut seen)?;
            if child.kind.accepts_children() {
                return Err(ServiceError::ValidationError(format!(
                    "{} blocks cannot be nested",
                    child.kind
                )));
            }
            if !child.children.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Blocks can only be nested one level deep".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn check_block(block: &mut Block, seen: &mut HashSet<Uuid>) -> Result<(), ServiceError> {
    if !seen.insert(block.id) {
        return Err(ServiceError::ValidationError(format!(
            "Duplicate block id {}",
            block.id
        )));
    }
    match &block.data {
        Value::Object(_) => Ok(()),
        Value::Null => {
            block.data = empty_object();
            Ok(())
        }
        _ => Err(ServiceError::ValidationError(format!(
            "Block {} data must be an object",
            block.id
        ))),
    }
}

/// The list holding `id` and its position there
fn locate_mut(blocks: &mut Vec<Block>, id: Uuid) -> Option<(&mut Vec<Block>, usize)> {
    if let Some(index) = blocks.iter().position(|block| block.id == id) {
        return Some((blocks, index));
    }
    for block in blocks.iter_mut() {
        if let Some(index) = block.children.iter().position(|child| child.id == id) {
            return Some((&mut block.children, index));
        }
    }
    None
}

fn find_mut(blocks: &mut [Block], id: Uuid) -> Option<&mut Block> {
    for block in blocks.iter_mut() {
        if block.id == id {
            return Some(block);
        }
        if let Some(child) = block.children.iter_mut().find(|child| child.id == id) {
            return Some(child);
        }
    }
    None
}

/// Appends a block of `kind` at the top level or inside `parent`.
pub fn insert_block(
    blocks: &mut Vec<Block>,
    kind: BlockKind,
    parent: Option<Uuid>,
) -> Result<Block, ServiceError> {
    let block = Block::new(kind);
    match parent {
        None => blocks.push(block.clone()),
        Some(parent_id) => {
            if kind.accepts_children() {
                return Err(ServiceError::ValidationError(format!(
                    "{} blocks cannot be nested",
                    kind
                )));
            }
            let parent = find_mut(blocks, parent_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Parent block {} not found", parent_id))
            })?;
            if !parent.kind.accepts_children() {
                return Err(ServiceError::ValidationError(format!(
                    "{} blocks cannot contain other blocks",
                    parent.kind
                )));
            }
            parent.children.push(block.clone());
        }
    }
    Ok(block)
}

pub fn remove_block(blocks: &mut Vec<Block>, id: Uuid) -> Result<Block, ServiceError> {
    let (siblings, index) = locate_mut(blocks, id)
        .ok_or_else(|| ServiceError::NotFound(format!("Block {} not found", id)))?;
    Ok(siblings.remove(index))
}

/// Swaps the block with its neighbour. Returns false at either edge.
pub fn move_block(
    blocks: &mut Vec<Block>,
    id: Uuid,
    direction: MoveDirection,
) -> Result<bool, ServiceError> {
    let (siblings, index) = locate_mut(blocks, id)
        .ok_or_else(|| ServiceError::NotFound(format!("Block {} not found", id)))?;
    let target = match direction {
        MoveDirection::Up if index > 0 => index - 1,
        MoveDirection::Down if index + 1 < siblings.len() => index + 1,
        _ => return Ok(false),
    };
    siblings.swap(index, target);
    Ok(true)
}

pub fn set_block_data(blocks: &mut [Block], id: Uuid, data: Value) -> Result<Block, ServiceError> {
    if !data.is_object() {
        return Err(ServiceError::ValidationError(
            "Block data must be an object".to_string(),
        ));
    }
    let block = find_mut(blocks, id)
        .ok_or_else(|| ServiceError::NotFound(format!("Block {} not found", id)))?;
    block.data = data;
    Ok(block.clone())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// String field of block data. Numbers and booleans are stringified;
/// anything else reads as empty.
fn field(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn safe_href(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let allowed = lowered.starts_with("https://")
        || lowered.starts_with("http://")
        || lowered.starts_with("mailto:")
        || (trimmed.starts_with('/') && !trimmed.starts_with("//"))
        || trimmed.starts_with('#');
    if allowed {
        escape_html(trimmed)
    } else {
        "#".to_string()
    }
}

fn grid_columns(data: &Value) -> u64 {
    let columns = match data.get("columns") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    columns.unwrap_or(3).clamp(1, 6)
}

fn render_block(out: &mut String, block: &Block) {
    let data = &block.data;
    // Writing into a String cannot fail.
    let _ = match block.kind {
        BlockKind::Header => write!(
            out,
            "<header class=\"cms-header\"><h1>{}</h1><p>{}</p></header>",
            escape_html(&field(data, "title")),
            escape_html(&field(data, "subtitle"))
        ),
        BlockKind::Section => {
            let _ = write!(
                out,
                "<section class=\"cms-section\"><h2>{}</h2>",
                escape_html(&field(data, "title"))
            );
            for child in &block.children {
                render_block(out, child);
            }
            write!(out, "</section>")
        }
        BlockKind::Grid => {
            let _ = write!(
                out,
                "<div class=\"cms-grid\" data-columns=\"{}\">",
                grid_columns(data)
            );
            for child in &block.children {
                out.push_str("<div class=\"cms-grid-item\">");
                render_block(out, child);
                out.push_str("</div>");
            }
            write!(out, "</div>")
        }
        BlockKind::Text => {
            out.push_str("<div class=\"cms-text\">");
            let content = field(data, "content");
            for paragraph in content.split("\n\n").filter(|p| !p.trim().is_empty()) {
                let _ = write!(
                    out,
                    "<p>{}</p>",
                    escape_html(paragraph.trim()).replace('\n', "<br>")
                );
            }
            write!(out, "</div>")
        }
        BlockKind::Cta => write!(
            out,
            "<div class=\"cms-cta\"><p>{}</p><a href=\"{}\">{}</a></div>",
            escape_html(&field(data, "text")),
            safe_href(&field(data, "href")),
            escape_html(&field(data, "label"))
        ),
    };
}

/// Renders blocks to HTML. Every text value is escaped.
pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        render_block(&mut out, block);
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePageInput {
    #[validate(regex = "SLUG_PATTERN", length(min = 1, max = 160))]
    pub slug: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePageInput {
    #[validate(regex = "SLUG_PATTERN", length(min = 1, max = 160))]
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CmsPageView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub blocks: Vec<Block>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CmsPageView {
    fn from_model(page: cms_page::Model) -> Result<Self, ServiceError> {
        let blocks: Vec<Block> = serde_json::from_value(page.blocks)?;
        Ok(Self {
            id: page.id,
            slug: page.slug,
            title: page.title,
            description: page.description,
            is_published: page.is_published,
            blocks,
            created_at: page.created_at,
            updated_at: page.updated_at,
        })
    }

    /// Full preview document body for the page
    pub fn render(&self) -> String {
        format!(
            "<article class=\"cms-page\" data-slug=\"{}\">{}</article>",
            escape_html(&self.slug),
            render_blocks(&self.blocks)
        )
    }
}

#[derive(Clone)]
pub struct CmsService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    revalidator: Arc<Revalidator>,
}

impl CmsService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        revalidator: Arc<Revalidator>,
    ) -> Self {
        Self {
            db,
            event_sender,
            revalidator,
        }
    }

    async fn find_model(&self, id: Uuid) -> Result<cms_page::Model, ServiceError> {
        cms_page::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Page {} not found", id)))
    }

    async fn ensure_unique_slug(&self, slug: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = cms_page::Entity::find().filter(cms_page::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(cms_page::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Page slug '{}' is already in use",
                slug
            )));
        }
        Ok(())
    }

    async fn changed(&self, id: Uuid) {
        self.revalidator.revalidate(&[paths::PAGES]).await;
        self.event_sender.send_or_log(Event::CmsPageChanged(id)).await;
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_page(&self, input: CreatePageInput) -> Result<CmsPageView, ServiceError> {
        input.validate()?;
        let mut blocks = input.blocks;
        validate_blocks(&mut blocks)?;
        self.ensure_unique_slug(&input.slug, None).await?;

        let now = Utc::now();
        let created = cms_page::ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set(input.slug),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            is_published: Set(false),
            blocks: Set(serde_json::to_value(&blocks)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.changed(created.id).await;
        info!(page_id = %created.id, slug = %created.slug, "CMS page created");
        CmsPageView::from_model(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_page(
        &self,
        id: Uuid,
        input: UpdatePageInput,
    ) -> Result<CmsPageView, ServiceError> {
        input.validate()?;
        let existing = self.find_model(id).await?;
        if let Some(slug) = &input.slug {
            if *slug != existing.slug {
                self.ensure_unique_slug(slug, Some(id)).await?;
            }
        }

        let mut active: cms_page::ActiveModel = existing.into();
        if let Some(slug) = input.slug {
            active.slug = Set(slug);
        }
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.changed(id).await;
        CmsPageView::from_model(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_page(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = cms_page::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Page {} not found", id)));
        }
        self.revalidator.revalidate(&[paths::PAGES]).await;
        self.event_sender.send_or_log(Event::CmsPageDeleted(id)).await;
        info!(page_id = %id, "CMS page deleted");
        Ok(())
    }

    pub async fn get_page(&self, id: Uuid) -> Result<CmsPageView, ServiceError> {
        CmsPageView::from_model(self.find_model(id).await?)
    }

    pub async fn list_pages(&self) -> Result<Vec<CmsPageView>, ServiceError> {
        cms_page::Entity::find()
            .order_by_asc(cms_page::Column::Slug)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(CmsPageView::from_model)
            .collect()
    }

    /// Storefront read of a published page, cached per slug
    pub async fn published_page(&self, slug: &str) -> Result<CmsPageView, ServiceError> {
        let key = format!("{}/{}", paths::PAGES, slug);
        let cache = self.revalidator.cache();
        if let Ok(Some(page)) = cache.get_json::<CmsPageView>(&key) {
            return Ok(page);
        }

        let page = cms_page::Entity::find()
            .filter(cms_page::Column::Slug.eq(slug))
            .filter(cms_page::Column::IsPublished.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Page '{}' not found", slug)))?;
        let view = CmsPageView::from_model(page)?;
        if let Err(e) = cache.set_json(&key, &view, None) {
            warn!(error = %e, "Failed to cache CMS page");
        }
        Ok(view)
    }

    /// Loads the page's blocks, applies `edit`, validates and saves.
    async fn edit_blocks<T, F>(&self, id: Uuid, edit: F) -> Result<(CmsPageView, T), ServiceError>
    where
        F: FnOnce(&mut Vec<Block>) -> Result<T, ServiceError>,
    {
        let existing = self.find_model(id).await?;
        let mut blocks: Vec<Block> = serde_json::from_value(existing.blocks.clone())?;
        let outcome = edit(&mut blocks)?;
        validate_blocks(&mut blocks)?;

        let mut active: cms_page::ActiveModel = existing.into();
        active.blocks = Set(serde_json::to_value(&blocks)?);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.changed(id).await;
        Ok((CmsPageView::from_model(updated)?, outcome))
    }

    #[instrument(skip(self, blocks))]
    pub async fn replace_blocks(
        &self,
        id: Uuid,
        blocks: Vec<Block>,
    ) -> Result<CmsPageView, ServiceError> {
        let (page, ()) = self
            .edit_blocks(id, move |current| {
                *current = blocks;
                Ok(())
            })
            .await?;
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn add_block(
        &self,
        id: Uuid,
        kind: BlockKind,
        parent: Option<Uuid>,
    ) -> Result<(CmsPageView, Block), ServiceError> {
        self.edit_blocks(id, |blocks| insert_block(blocks, kind, parent))
            .await
    }

    #[instrument(skip(self, data))]
    pub async fn update_block_data(
        &self,
        id: Uuid,
        block_id: Uuid,
        data: Value,
    ) -> Result<CmsPageView, ServiceError> {
        let (page, _) = self
            .edit_blocks(id, |blocks| set_block_data(blocks, block_id, data))
            .await?;
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn remove_block(&self, id: Uuid, block_id: Uuid) -> Result<CmsPageView, ServiceError> {
        let (page, _) = self
            .edit_blocks(id, |blocks| remove_block(blocks, block_id))
            .await?;
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn move_block(
        &self,
        id: Uuid,
        block_id: Uuid,
        direction: MoveDirection,
    ) -> Result<CmsPageView, ServiceError> {
        let (page, _) = self
            .edit_blocks(id, |blocks| move_block(blocks, block_id, direction))
            .await?;
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn set_published(&self, id: Uuid, published: bool) -> Result<CmsPageView, ServiceError> {
        let existing = self.find_model(id).await?;
        let mut active: cms_page::ActiveModel = existing.into();
        active.is_published = Set(published);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.revalidator.revalidate(&[paths::PAGES]).await;
        self.event_sender
            .send_or_log(Event::CmsPagePublished {
                page_id: id,
                published,
            })
            .await;
        info!(page_id = %id, published, "CMS page publication changed");
        CmsPageView::from_model(updated)
    }

    /// HTML preview of a page, published or not
    pub async fn render_preview(&self, id: Uuid) -> Result<String, ServiceError> {
        Ok(self.get_page(id).await?.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn block(kind: BlockKind, data: Value) -> Block {
        Block {
            id: Uuid::new_v4(),
            kind,
            data,
            children: Vec::new(),
        }
    }

    #[test]
    fn add_block_uses_default_data_and_respects_nesting() {
        let mut blocks = Vec::new();
        let section = insert_block(&mut blocks, BlockKind::Section, None).unwrap();
        let text = insert_block(&mut blocks, BlockKind::Text, Some(section.id)).unwrap();
        assert_eq!(text.data, json!({ "content": "" }));
        assert_eq!(blocks[0].children.len(), 1);

        assert_matches!(
            insert_block(&mut blocks, BlockKind::Grid, Some(section.id)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            insert_block(&mut blocks, BlockKind::Text, Some(text.id)),
            Err(ServiceError::ValidationError(_))
        );
        assert!(blocks[0].children[0].children.is_empty());
        assert_matches!(
            insert_block(&mut blocks, BlockKind::Text, Some(Uuid::new_v4())),
            Err(ServiceError::NotFound(_))
        );
    }

    #[test]
    fn move_swaps_with_sibling_and_stops_at_edges() {
        let mut blocks = vec![
            block(BlockKind::Header, json!({})),
            block(BlockKind::Text, json!({})),
            block(BlockKind::Cta, json!({})),
        ];
        let first = blocks[0].id;
        let last = blocks[2].id;

        assert!(!move_block(&mut blocks, first, MoveDirection::Up).unwrap());
        assert!(!move_block(&mut blocks, last, MoveDirection::Down).unwrap());
        assert!(move_block(&mut blocks, first, MoveDirection::Down).unwrap());
        assert_eq!(blocks[1].id, first);
        assert_eq!(blocks[0].kind, BlockKind::Text);
    }

    #[test]
    fn move_and_remove_reach_children() {
        let mut grid = block(BlockKind::Grid, json!({ "columns": 2 }));
        let a = block(BlockKind::Text, json!({ "content": "a" }));
        let b = block(BlockKind::Text, json!({ "content": "b" }));
        let b_id = b.id;
        grid.children = vec![a, b];
        let mut blocks = vec![grid];

        assert!(move_block(&mut blocks, b_id, MoveDirection::Up).unwrap());
        assert_eq!(blocks[0].children[0].id, b_id);
        let removed = remove_block(&mut blocks, b_id).unwrap();
        assert_eq!(removed.id, b_id);
        assert_eq!(blocks[0].children.len(), 1);
    }

    #[test]
    fn validation_rejects_bad_trees() {
        let mut leaf_with_children = block(BlockKind::Text, json!({}));
        leaf_with_children.children.push(block(BlockKind::Text, json!({})));
        assert!(validate_blocks(&mut [leaf_with_children]).is_err());

        let dup = block(BlockKind::Text, json!({}));
        assert!(validate_blocks(&mut [dup.clone(), dup]).is_err());

        assert!(validate_blocks(&mut [block(BlockKind::Cta, json!("x"))]).is_err());

        let mut nulls = [block(BlockKind::Cta, Value::Null)];
        validate_blocks(&mut nulls).unwrap();
        assert_eq!(nulls[0].data, json!({}));
    }

    #[test]
    fn render_escapes_and_defaults_missing_fields() {
        let mut section = block(BlockKind::Section, json!({ "title": "<Bridal>" }));
        section
            .children
            .push(block(BlockKind::Text, json!({ "content": "One & two\n\nThree" })));
        let blocks = vec![
            block(BlockKind::Header, json!({ "title": "Hi" })),
            section,
            block(
                BlockKind::Cta,
                json!({ "label": "Shop", "href": "javascript:alert(1)" }),
            ),
        ];

        let html = render_blocks(&blocks);
        assert!(html.contains("<h1>Hi</h1><p></p>"));
        assert!(html.contains("<h2>&lt;Bridal&gt;</h2>"));
        assert!(html.contains("<p>One &amp; two</p><p>Three</p>"));
        assert!(html.contains("<a href=\"#\">Shop</a>"));
    }

    #[test]
    fn grid_columns_are_clamped() {
        let mut grid = block(BlockKind::Grid, json!({ "columns": 40 }));
        grid.children.push(block(BlockKind::Text, json!({})));
        let html = render_blocks(&[grid]);
        assert!(html.starts_with("<div class=\"cms-grid\" data-columns=\"6\">"));
        assert!(html.contains("<div class=\"cms-grid-item\"><div class=\"cms-text\"></div></div>"));
    }

    #[test]
    fn block_kind_parses_from_text() {
        assert_eq!("CTA".parse::<BlockKind>().unwrap(), BlockKind::Cta);
        assert!("carousel".parse::<BlockKind>().is_err());
    }
}
