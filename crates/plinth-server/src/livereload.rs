//! Live-reload channel between the build tasks and connected browsers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established.
    Connected,

    /// Full page reload.
    Reload,

    /// Swap the listed stylesheets in place, no page reload.
    RefreshCss {
        /// Output-relative stylesheet paths.
        paths: Vec<String>,
    },

    /// Show a transient notice (build failures).
    Notify { message: String },
}

/// How task completions are surfaced to connected browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadStrategy {
    /// Stylesheets are hot-swapped; everything else reloads the page.
    Inject,

    /// Every completed task reloads the page.
    Full,

    /// Rebuild silently; the browser is never poked.
    None,
}

impl ReloadStrategy {
    /// Message to push after the stylesheet pipeline wrote `paths`.
    pub fn css_message(self, paths: Vec<String>) -> Option<ReloadMessage> {
        match self {
            ReloadStrategy::Inject => Some(ReloadMessage::RefreshCss { paths }),
            ReloadStrategy::Full => Some(ReloadMessage::Reload),
            ReloadStrategy::None => None,
        }
    }

    /// Message to push after a script or site rebuild.
    pub fn reload_message(self) -> Option<ReloadMessage> {
        match self {
            ReloadStrategy::Inject | ReloadStrategy::Full => Some(ReloadMessage::Reload),
            ReloadStrategy::None => None,
        }
    }
}

/// Hub broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side reload script, served at `/__livereload.js` and injected
/// into every HTML page the dev server hands out.
pub fn livereload_script() -> String {
    r#"
(function() {
  'use strict';

  var proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var ws = new WebSocket(proto + location.host + '/__livereload');

  ws.onmessage = function(event) {
    var msg = JSON.parse(event.data);

    switch (msg.type) {
      case 'reload':
        location.reload();
        break;

      case 'refresh_css':
        document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {
          var href = link.getAttribute('href');
          if (!href) return;
          var base = href.split('?')[0];
          var name = base.split('/').pop();
          var hit = msg.paths.some(function(p) { return p.split('/').pop() === name; });
          if (hit) {
            link.setAttribute('href', base + '?t=' + Date.now());
          }
        });
        break;

      case 'notify':
        console.warn('[plinth] ' + msg.message);
        var banner = document.getElementById('__plinth-notice');
        if (!banner) {
          banner = document.createElement('div');
          banner.id = '__plinth-notice';
          banner.style.cssText = 'position:fixed;bottom:1rem;right:1rem;padding:0.5rem 1rem;' +
            'background:#b91c1c;color:#fff;font:14px system-ui;border-radius:4px;z-index:99999';
          document.body.appendChild(banner);
        }
        banner.textContent = msg.message;
        setTimeout(function() { banner.remove(); }, 5000);
        break;

      case 'connected':
        console.log('[plinth] live reload connected');
        break;
    }
  };

  ws.onclose = function() {
    console.log('[plinth] live reload disconnected');
  };
})();
"#
    .to_string()
}
