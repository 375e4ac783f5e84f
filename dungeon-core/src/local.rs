//! In-process collaborators.
//!
//! Small, map-backed implementations of the collaborator traits for
//! single-process hosts, dry runs and tests. None of them talk to a chat
//! platform.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::collaborators::{AreaDirectory, LocationResolver, NotificationSink};
use crate::error::{NotifyError, ResolveError};
use crate::types::{AvatarId, ChannelRef, GuildScope, Location, LocationId};

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Location catalogue keyed by guild, matching names case-insensitively.
#[derive(Debug, Default)]
pub struct LocationCatalog {
    locations: RwLock<Vec<(GuildScope, Location)>>,
    auto_create: bool,
}

impl LocationCatalog {
    /// Catalogue that only resolves locations added with [`insert`](Self::insert).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue that creates unknown destinations on first use, each with its
    /// own channel.
    #[must_use]
    pub fn auto_creating() -> Self {
        Self {
            locations: RwLock::default(),
            auto_create: true,
        }
    }

    /// Register a location in `scope`.
    pub fn insert(&self, scope: GuildScope, location: Location) {
        self.locations.write().push((scope, location));
    }

    /// Number of known locations across all guilds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.read().len()
    }

    /// Whether the catalogue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.read().is_empty()
    }
}

fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl LocationResolver for LocationCatalog {
    async fn find_or_create(
        &self,
        scope: &GuildScope,
        query: &str,
    ) -> Result<Option<Location>, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let found = self
            .locations
            .read()
            .iter()
            .find(|(s, l)| s == scope && (l.name.eq_ignore_ascii_case(query) || l.id.0 == query))
            .map(|(_, l)| l.clone());
        if found.is_some() || !self.auto_create {
            return Ok(found);
        }

        let id = format!("{scope}/{}", slug(query));
        let location = Location {
            id: LocationId::new(id.clone()),
            name: query.to_string(),
            channel: Some(ChannelRef(id)),
            image_url: None,
        };
        self.insert(scope.clone(), location.clone());
        Ok(Some(location))
    }

    async fn location(&self, id: &LocationId) -> Result<Option<Location>, ResolveError> {
        Ok(self
            .locations
            .read()
            .iter()
            .find(|(_, l)| &l.id == id)
            .map(|(_, l)| l.clone()))
    }
}

// ---------------------------------------------------------------------------
// Area directory
// ---------------------------------------------------------------------------

/// Who is where, by display name.
#[derive(Debug, Default)]
pub struct RosterDirectory {
    entries: RwLock<Vec<(Option<LocationId>, AvatarId, String)>>,
}

impl RosterDirectory {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `avatar`, displayed as `name`, is in `area`. Replaces any
    /// previous entry for the same avatar.
    pub fn place(&self, area: Option<LocationId>, avatar: AvatarId, name: impl Into<String>) {
        let mut entries = self.entries.write();
        entries.retain(|(_, id, _)| *id != avatar);
        entries.push((area, avatar, name.into()));
    }
}

#[async_trait]
impl AreaDirectory for RosterDirectory {
    async fn find_avatars(
        &self,
        area: Option<&LocationId>,
        query: &str,
    ) -> Result<Vec<AvatarId>, ResolveError> {
        let query = query.trim();
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|(a, _, name)| a.as_ref() == area && name.eq_ignore_ascii_case(query))
            .map(|(_, id, _)| id.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A notification captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotice {
    /// Where it went.
    pub channel: ChannelRef,
    /// What it said.
    pub text: String,
    /// Persona it was sent as.
    pub display_name: String,
    /// Persona image.
    pub display_image: Option<String>,
}

/// Sink that keeps every notification in memory instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentNotice>>,
    failing: AtomicBool,
}

impl RecordingSink {
    /// Sink that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything accepted so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<SentNotice> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(
        &self,
        channel: &ChannelRef,
        text: &str,
        display_name: &str,
        display_image: Option<&str>,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError(format!("delivery to {channel} refused")));
        }
        self.sent.lock().push(SentNotice {
            channel: channel.clone(),
            text: text.to_string(),
            display_name: display_name.to_string(),
            display_image: display_image.map(str::to_string),
        });
        Ok(())
    }
}
