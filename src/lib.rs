//! Board-game community reputation service.
mod actions;
mod api;
mod assets;
mod config;
pub mod error;
mod levels;
mod metrics;
mod reputation;
mod serve;
mod store;
mod votes;


pub use serve::run;

/// The index (/) route.
async fn index() -> impl axum::response::IntoResponse {
    r"
   .-------.
  /   o   /|      m e e p l e h a l l
 .-------. |
 | o   o | |      reputation, levels, and votes
 |   o   | '      for the board-game hall
 | o   o |/
 '-------'

API routes are under /api/

  XP and levels: /api/reputation/
          Posts: /api/posts/
      Cosmetics: /api/assets/
    "
}
