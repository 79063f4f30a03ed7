//! Menu browsing for Net Radio and Server.
//!
//! The device only offers stateful cursor movement (`Direct_Sel` a visible
//! line, `Cursor Return`, `Page Up/Down`), so a menu node is addressed by the
//! steps taken from the top menu. A path token is those steps joined by
//! colons: `"2:5"` selects line 2, then line 5 of the resulting list;
//! `"3:pgdn"` selects line 3 then pages down.
//!
//! The adapter remembers the steps it last drove the device through. When a
//! requested path extends that position only the missing steps are sent,
//! otherwise the menu is first returned to layer 1 and every step replayed.

use serde::Serialize;
use std::fmt;

use super::commands::playback_body;
use super::source::Source;
use super::state::MenuCursor;
use super::ReceiverAdapter;
use crate::error::{ReceiverError, Result};
use crate::protocol::{self, nest, XmlElement};

/// Lines the device shows per page.
pub const PAGE_SIZE: u32 = 8;

const PAGE_UP_TOKEN: &str = "pgup";
const PAGE_DOWN_TOKEN: &str = "pgdn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStep {
    /// 1-based line of the current page.
    Line(u8),
    PageUp,
    PageDown,
}

impl fmt::Display for NavStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(n) => write!(f, "{}", n),
            Self::PageUp => f.write_str(PAGE_UP_TOKEN),
            Self::PageDown => f.write_str(PAGE_DOWN_TOKEN),
        }
    }
}

impl NavStep {
    fn parse(token: &str) -> Result<Self> {
        match token {
            PAGE_UP_TOKEN => Ok(Self::PageUp),
            PAGE_DOWN_TOKEN => Ok(Self::PageDown),
            line => line
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=PAGE_SIZE as u8).contains(n))
                .map(Self::Line)
                .ok_or_else(|| ReceiverError::InvalidPath(token.to_string())),
        }
    }
}

/// Parse a colon-delimited path token. The empty token is the root.
pub fn parse_path(token: &str) -> Result<Vec<NavStep>> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(Vec::new());
    }
    token.split(':').map(NavStep::parse).collect()
}

pub fn format_path(steps: &[NavStep]) -> String {
    steps
        .iter()
        .map(NavStep::to_string)
        .collect::<Vec<_>>()
        .join(":")
}

// =============================================================================
// List_Info
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Container,
    Item,
    Unselectable,
}

impl LineKind {
    fn from_attribute(attribute: &str) -> Self {
        match attribute {
            "Container" => Self::Container,
            "Item" => Self::Item,
            _ => Self::Unselectable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLine {
    pub line: u8,
    pub text: String,
    pub kind: LineKind,
}

/// One `List_Info` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuListing {
    pub ready: bool,
    pub layer: u32,
    pub name: String,
    pub lines: Vec<MenuLine>,
    pub current_line: u32,
    pub max_line: u32,
}

impl MenuListing {
    pub fn parse(doc: &XmlElement) -> Result<Self> {
        let info = doc.require_payload()?;
        let status = info
            .child_text("Menu_Status")
            .ok_or_else(|| malformed("List_Info has no Menu_Status"))?;
        let layer = info
            .child_text("Menu_Layer")
            .and_then(|l| l.trim().parse().ok())
            .ok_or_else(|| malformed("List_Info has no usable Menu_Layer"))?;

        let mut lines = Vec::new();
        if let Some(list) = info.child("Current_List") {
            for node in &list.children {
                let Some(line) = node
                    .tag
                    .strip_prefix("Line_")
                    .and_then(|n| n.parse::<u8>().ok())
                else {
                    continue;
                };
                lines.push(MenuLine {
                    line,
                    text: node.child_text("Txt").unwrap_or_default().to_string(),
                    kind: LineKind::from_attribute(node.child_text("Attribute").unwrap_or_default()),
                });
            }
        }

        let cursor = |tag: &str| {
            info.path(&["Cursor_Position", tag])
                .and_then(|n| n.text().trim().parse().ok())
                .unwrap_or(0)
        };

        Ok(Self {
            ready: status != "Busy",
            layer,
            name: info.child_text("Menu_Name").unwrap_or_default().to_string(),
            lines,
            current_line: cursor("Current_Line"),
            max_line: cursor("Max_Line"),
        })
    }

    pub fn line(&self, line: u8) -> Option<&MenuLine> {
        self.lines.iter().find(|l| l.line == line)
    }

    /// 0-based page the cursor is on.
    fn page(&self) -> u32 {
        self.current_line.saturating_sub(1) / PAGE_SIZE
    }

    fn has_previous_page(&self) -> bool {
        self.max_line > PAGE_SIZE && self.page() > 0
    }

    fn has_next_page(&self) -> bool {
        self.max_line > PAGE_SIZE && (self.page() + 1) * PAGE_SIZE < self.max_line
    }
}

fn malformed(msg: &str) -> ReceiverError {
    ReceiverError::MalformedResponse(msg.to_string())
}

// =============================================================================
// Browse results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseItem {
    pub title: String,
    /// Path token to browse or play this entry.
    pub id: String,
    pub playable: bool,
    pub expandable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseMedia {
    pub title: String,
    pub id: String,
    pub items: Vec<BrowseItem>,
}

impl BrowseMedia {
    fn from_listing(source: Source, path: &[NavStep], listing: &MenuListing) -> Self {
        let child_id = |step: NavStep| {
            let mut child = path.to_vec();
            child.push(step);
            format_path(&child)
        };
        let page_item = |title: &str, step: NavStep| BrowseItem {
            title: title.to_string(),
            id: child_id(step),
            playable: false,
            expandable: true,
        };

        let mut items = Vec::new();
        let paginated = source == Source::Server;
        if paginated && listing.has_previous_page() {
            items.push(page_item("Page up", NavStep::PageUp));
        }
        items.extend(
            listing
                .lines
                .iter()
                .filter(|l| l.kind != LineKind::Unselectable && !l.text.is_empty())
                .map(|l| BrowseItem {
                    title: l.text.clone(),
                    id: child_id(NavStep::Line(l.line)),
                    playable: l.kind == LineKind::Item,
                    expandable: l.kind == LineKind::Container,
                }),
        );
        if paginated && listing.has_next_page() {
            items.push(page_item("Page down", NavStep::PageDown));
        }

        let title = if listing.name.is_empty() {
            source.label().to_string()
        } else {
            listing.name.clone()
        };

        Self {
            title,
            id: format_path(path),
            items,
        }
    }
}

// =============================================================================
// Navigation
// =============================================================================

impl ReceiverAdapter {
    /// List a menu node, `None` meaning the root. Any failure is logged and
    /// reported as no listing.
    pub async fn browse(&mut self, path: Option<&str>) -> Option<BrowseMedia> {
        match self.try_browse(path).await {
            Ok(media) => Some(media),
            Err(e) => {
                tracing::warn!("Browse {:?} failed: {}", path.unwrap_or(""), e);
                None
            }
        }
    }

    pub async fn try_browse(&mut self, path: Option<&str>) -> Result<BrowseMedia> {
        let (source, endpoint) = self.browsable_source("browse")?;
        let steps = parse_path(path.unwrap_or_default())?;

        let listing = if steps.is_empty() {
            self.list_root(source, endpoint).await
        } else {
            self.navigate(source, endpoint, &steps).await
        };
        let listing = listing.inspect_err(|_| self.state.navigation = None)?;

        Ok(BrowseMedia::from_listing(source, &steps, &listing))
    }

    /// Select the item at `path` and start playback.
    pub(super) async fn play_menu_item(&mut self, source: Source, path: &str) -> Result<()> {
        let endpoint = source
            .play_info_endpoint()
            .ok_or_else(|| ReceiverError::unsupported("play_media", source.label()))?;
        let mut steps = parse_path(path)?;
        let Some(NavStep::Line(line)) = steps.pop() else {
            return Err(ReceiverError::InvalidPath(path.to_string()));
        };

        let parent = if steps.is_empty() {
            self.list_root(source, endpoint).await
        } else {
            self.navigate(source, endpoint, &steps).await
        };
        let parent = parent.inspect_err(|_| self.state.navigation = None)?;

        match parent.line(line) {
            Some(entry) if entry.kind == LineKind::Item => {
                tracing::info!("Playing {:?} from {} menu", entry.text, source);
            }
            _ => return Err(ReceiverError::InvalidPath(path.to_string())),
        }

        // The device leaves the list for its play screen
        self.state.navigation = None;
        self.select_line(endpoint, line).await?;
        self.put(&playback_body(endpoint, "Play")).await
    }

    fn browsable_source(&self, operation: &str) -> Result<(Source, &'static str)> {
        self.state
            .source
            .filter(Source::is_browsable)
            .and_then(|s| s.play_info_endpoint().map(|ep| (s, ep)))
            .ok_or_else(|| ReceiverError::unsupported(operation, self.current_source_label()))
    }

    /// Server always returns to layer 1. Net Radio only does when this
    /// adapter moved the menu away from it.
    async fn list_root(&mut self, source: Source, endpoint: &str) -> Result<MenuListing> {
        let moved_by_us = self
            .state
            .navigation
            .as_ref()
            .is_some_and(|cursor| cursor.source == source && !cursor.path.is_empty());
        let listing = if source == Source::Server || moved_by_us {
            self.reset_to_root(endpoint).await?
        } else {
            self.list_ready(endpoint).await?
        };
        // A deeper menu we did not drive is not a prefix of any path
        self.state.navigation = (listing.layer <= 1).then(|| MenuCursor {
            source,
            path: Vec::new(),
        });
        Ok(listing)
    }

    async fn navigate(
        &mut self,
        source: Source,
        endpoint: &str,
        steps: &[NavStep],
    ) -> Result<MenuListing> {
        let resume_at = self
            .state
            .navigation
            .as_ref()
            .filter(|cursor| cursor.source == source && steps.starts_with(&cursor.path))
            .map(|cursor| cursor.path.len());

        let mut listing = None;
        let start = match resume_at {
            Some(done) => done,
            None => {
                listing = Some(self.reset_to_root(endpoint).await?);
                0
            }
        };
        tracing::debug!(
            "Navigating {} menu to {:?} (replaying {} of {} steps)",
            source,
            format_path(steps),
            steps.len() - start,
            steps.len()
        );

        self.state.navigation = None;
        for step in &steps[start..] {
            match step {
                NavStep::Line(line) => self.select_line(endpoint, *line).await?,
                NavStep::PageUp => self.page(endpoint, "Up").await?,
                NavStep::PageDown => self.page(endpoint, "Down").await?,
            }
            listing = Some(self.list_ready(endpoint).await?);
        }

        let listing = match listing {
            Some(listing) => listing,
            None => self.list_ready(endpoint).await?,
        };
        self.state.navigation = Some(MenuCursor {
            source,
            path: steps.to_vec(),
        });
        Ok(listing)
    }

    /// Send `Cursor Return` until the menu reports layer 1.
    async fn reset_to_root(&mut self, endpoint: &str) -> Result<MenuListing> {
        let max_steps = self.navigation.max_return_steps;
        let mut listing = self.list_ready(endpoint).await?;
        for _ in 0..max_steps {
            if listing.layer <= 1 {
                return Ok(listing);
            }
            self.put(&nest(&[endpoint, "List_Control", "Cursor"], "Return"))
                .await?;
            listing = self.list_ready(endpoint).await?;
        }
        if listing.layer <= 1 {
            return Ok(listing);
        }
        tracing::warn!(
            "{} menu still at layer {} after {} returns",
            endpoint,
            listing.layer,
            max_steps
        );
        Err(ReceiverError::NavigationBusy {
            attempts: max_steps,
        })
    }

    /// Query `List_Info`, waiting out `Busy` within the retry budget.
    async fn list_ready(&mut self, endpoint: &str) -> Result<MenuListing> {
        let retries = self.navigation.busy_retries;
        let delay = self.navigation.busy_delay();
        for attempt in 0..=retries {
            let doc = self.get(&protocol::query(endpoint, "List_Info")).await?;
            let listing = MenuListing::parse(&doc)?;
            if listing.ready {
                return Ok(listing);
            }
            tracing::debug!("{} menu busy ({}/{})", endpoint, attempt + 1, retries + 1);
            if attempt < retries && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Err(ReceiverError::NavigationBusy {
            attempts: retries + 1,
        })
    }

    async fn select_line(&mut self, endpoint: &str, line: u8) -> Result<()> {
        self.put(&nest(
            &[endpoint, "List_Control", "Direct_Sel"],
            &format!("Line_{}", line),
        ))
        .await
    }

    async fn page(&mut self, endpoint: &str, direction: &str) -> Result<()> {
        self.put(&nest(&[endpoint, "List_Control", "Page"], direction))
            .await
    }
}
