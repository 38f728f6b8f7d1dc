//! Loads media embeds into their players.

use std::rc::{Rc, Weak};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::application::runtime::{LoopHandle, Scope, TaskHandle, Teardown};
use crate::domain::entities::{EmbedPlacement, MediaEmbed};
use crate::domain::ports::{EmbedPlayer, MediaSource, Progress};

/// Pending embed load.
pub struct EmbedLoad {
    pub task: TaskHandle,
    pub progress: watch::Receiver<Progress>,
}

#[derive(Clone)]
pub struct EmbedLoader {
    source: Arc<dyn MediaSource>,
    handle: LoopHandle,
}

impl EmbedLoader {
    #[must_use]
    pub fn new(source: Arc<dyn MediaSource>, handle: LoopHandle) -> Self {
        Self { source, handle }
    }

    /// Fetches `embed` in the background and points `player` at the cached
    /// file. Failures are rendered according to `placement`.
    ///
    /// The player is held weakly; a player dropped before the fetch
    /// finishes is simply skipped.
    pub fn load(
        &self,
        scope: &Scope,
        embed: &MediaEmbed,
        placement: EmbedPlacement,
        player: &Rc<dyn EmbedPlayer>,
    ) -> EmbedLoad {
        let (tx, progress) = watch::channel(Progress::Pending);
        let source = Arc::clone(&self.source);
        let kind = embed.kind;
        let url = embed.url.clone();
        let player: Weak<dyn EmbedPlayer> = Rc::downgrade(player);

        debug!(?kind, %url, "loading embed");
        let task = self.handle.run_async(
            scope,
            async move { source.fetch(kind, &url, tx).await },
            move |result| {
                let Some(player) = player.upgrade() else {
                    return;
                };
                match result {
                    Ok(path) => {
                        player.set_url(&path.to_string_lossy());
                        if kind.autoplays() {
                            player.play();
                        }
                    }
                    Err(e) => {
                        warn!(?kind, error = %e, "embed fetch failed");
                        player.on_error(placement.failure_style(), &e.to_string());
                    }
                }
            },
        );

        EmbedLoad { task, progress }
    }
}

/// Plays `player` while `scope` is visible and pauses it when hidden.
pub fn bind_playback(scope: &Scope, player: &Rc<dyn EmbedPlayer>) {
    let player: Weak<dyn EmbedPlayer> = Rc::downgrade(player);
    scope.on_renew(move || -> Teardown {
        let Some(live) = player.upgrade() else {
            return Box::new(|| {});
        };
        live.play();
        let player = Weak::clone(&player);
        Box::new(move || {
            if let Some(player) = player.upgrade() {
                player.pause();
            }
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::runtime::UiLoop;
    use crate::domain::entities::{EmbedFailureStyle, EmbedKind};
    use crate::domain::errors::MediaError;
    use crate::domain::ports::mocks::MockEmbedPlayer;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct FakeSource {
        status: Option<u16>,
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        async fn fetch(
            &self,
            kind: EmbedKind,
            url: &str,
            progress: watch::Sender<Progress>,
        ) -> Result<PathBuf, MediaError> {
            if let Some(status) = self.status {
                return Err(MediaError::Status { status });
            }
            let _ = progress.send(Progress::Done);
            let name = url.rsplit('/').next().unwrap_or_default();
            Ok(PathBuf::from("/cache").join(kind.cache_dir()).join(name))
        }
    }

    fn loader(ui: &UiLoop, status: Option<u16>) -> EmbedLoader {
        EmbedLoader::new(Arc::new(FakeSource { status }), ui.handle())
    }

    #[tokio::test]
    async fn test_gif_loads_and_autoplays() {
        let mut ui = UiLoop::new();
        let scope = Scope::visible();
        let mut mock = MockEmbedPlayer::new();
        mock.expect_set_url()
            .withf(|path| path == "/cache/images/cat.gif")
            .times(1)
            .return_const(());
        mock.expect_play().times(1).return_const(());
        let player: Rc<dyn EmbedPlayer> = Rc::new(mock);

        let load = loader(&ui, None).load(
            &scope,
            &MediaEmbed::new(EmbedKind::Gif, "https://cdn/cat.gif"),
            EmbedPlacement::default(),
            &player,
        );

        assert!(ui.turn().await);
        assert_eq!(*load.progress.borrow(), Progress::Done);
    }

    #[tokio::test]
    async fn test_video_loads_without_autoplay() {
        let mut ui = UiLoop::new();
        let scope = Scope::visible();
        let mut mock = MockEmbedPlayer::new();
        mock.expect_set_url().times(1).return_const(());
        mock.expect_play().never();
        let player: Rc<dyn EmbedPlayer> = Rc::new(mock);

        loader(&ui, None).load(
            &scope,
            &MediaEmbed::new(EmbedKind::Video, "https://cdn/clip.mp4"),
            EmbedPlacement::default(),
            &player,
        );
        assert!(ui.turn().await);
    }

    #[tokio::test]
    async fn test_failure_uses_placement_style() {
        let mut ui = UiLoop::new();
        let scope = Scope::visible();
        let mut mock = MockEmbedPlayer::new();
        mock.expect_set_url().never();
        mock.expect_on_error()
            .withf(|style, tooltip| {
                *style == EmbedFailureStyle::InlineLabel && tooltip.contains("404")
            })
            .times(1)
            .return_const(());
        let player: Rc<dyn EmbedPlayer> = Rc::new(mock);

        loader(&ui, Some(404)).load(
            &scope,
            &MediaEmbed::new(EmbedKind::Image, "https://cdn/gone.png"),
            EmbedPlacement {
                can_hide: false,
                primary: true,
            },
            &player,
        );
        assert!(ui.turn().await);
    }

    #[tokio::test]
    async fn test_dropped_player_is_skipped() {
        let mut ui = UiLoop::new();
        let scope = Scope::visible();
        let player: Rc<dyn EmbedPlayer> = Rc::new(MockEmbedPlayer::new());

        loader(&ui, None).load(
            &scope,
            &MediaEmbed::new(EmbedKind::Audio, "https://cdn/a.ogg"),
            EmbedPlacement::default(),
            &player,
        );
        drop(player);
        assert!(ui.turn().await);
    }

    #[test]
    fn test_playback_follows_visibility() {
        let scope = Scope::visible();
        let mut mock = MockEmbedPlayer::new();
        mock.expect_play().times(2).return_const(());
        mock.expect_pause().times(1).return_const(());
        let player: Rc<dyn EmbedPlayer> = Rc::new(mock);

        bind_playback(&scope, &player);
        scope.set_visible(false);
        scope.set_visible(true);
    }
}
