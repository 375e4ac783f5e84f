//! Interfaces the engine consumes from its host.
//!
//! The chat platform, the location catalogue, target lookup and narrative
//! text all live outside this crate. Hosts plug in implementations of these
//! traits; tests plug in in-memory doubles.

use async_trait::async_trait;

use crate::error::{NotifyError, ResolveError};
use crate::types::{Avatar, AvatarId, ChannelRef, GuildScope, Location, LocationId};

/// Resolves human-readable destinations into locations.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    /// Find the location matching `query` in `scope`, creating it if the
    /// host's rules allow. `Ok(None)` means nothing could be found or made.
    ///
    /// # Errors
    /// Returns [`ResolveError`] when the lookup itself failed.
    async fn find_or_create(
        &self,
        scope: &GuildScope,
        query: &str,
    ) -> Result<Option<Location>, ResolveError>;

    /// Look up a known location by id.
    ///
    /// # Errors
    /// Returns [`ResolveError`] when the lookup itself failed.
    async fn location(&self, id: &LocationId) -> Result<Option<Location>, ResolveError>;
}

/// Finds avatars by name within an area.
#[async_trait]
pub trait AreaDirectory: Send + Sync {
    /// Every avatar in `area` whose name matches `query`. The combat resolver
    /// only proceeds when exactly one avatar matches.
    ///
    /// # Errors
    /// Returns [`ResolveError`] when the lookup itself failed.
    async fn find_avatars(
        &self,
        area: Option<&LocationId>,
        query: &str,
    ) -> Result<Vec<AvatarId>, ResolveError>;
}

/// Best-effort delivery of narrative text into a channel under a persona.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Post `text` to `channel`, attributed to `display_name` / `display_image`.
    ///
    /// # Errors
    /// Returns [`NotifyError`] on delivery failure. Callers log and continue.
    async fn send(
        &self,
        channel: &ChannelRef,
        text: &str,
        display_name: &str,
        display_image: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Produces the prose for departures and arrivals.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Text announced in the location being left.
    ///
    /// # Errors
    /// Returns [`NotifyError`] if no text could be produced.
    async fn departure(
        &self,
        avatar: &Avatar,
        from: &Location,
        to: &Location,
    ) -> Result<String, NotifyError>;

    /// Text the avatar says on arriving.
    ///
    /// # Errors
    /// Returns [`NotifyError`] if no text could be produced.
    async fn arrival(&self, avatar: &Avatar, at: &Location) -> Result<String, NotifyError>;
}

/// Fixed-sentence narrator for hosts without a text generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainNarrator;

#[async_trait]
impl Narrator for PlainNarrator {
    async fn departure(
        &self,
        avatar: &Avatar,
        _from: &Location,
        to: &Location,
    ) -> Result<String, NotifyError> {
        Ok(format!("{} departs for {}.", avatar.name, to.name))
    }

    async fn arrival(&self, avatar: &Avatar, at: &Location) -> Result<String, NotifyError> {
        Ok(format!("{} arrives in {}.", avatar.name, at.name))
    }
}
