//! Message codec.
//!
//! Pure builders that turn a configuration/model snapshot into the
//! protocol-version-specific request for one operation. Builders never send
//! anything; the only state they touch is the sent-position counter, which
//! advances when a stroke batch is extracted.
//!
//! | Module      | Contents                                          |
//! |-------------|---------------------------------------------------|
//! | `request`   | Outbound wire enum ([`Request`])                  |
//! | `v3`        | Variant A handshake and `start`/`continue`        |
//! | `v4`        | Variant B session and document actions            |
//! | `challenge` | HMAC-SHA512 challenge answers                     |
//! | `style`     | Pen style / theme serialization                   |

mod challenge;
mod request;
pub mod style;
pub mod v3;
pub mod v4;

pub use challenge::compute_hmac;
pub use request::{Component, Request, StrokePayload};
pub use style::{PenStyle, Theme};

use crate::model::{Model, Positions, Stroke};

/// Extract the strokes after the last sent position and advance it.
///
/// Returns `None` (and leaves both counters untouched) when nothing is new.
pub(crate) fn take_pending<T>(
    positions: &mut Positions,
    model: &mut Model,
    map: impl Fn(&Stroke) -> T,
) -> Option<Vec<T>> {
    let pending: Vec<T> = model
        .strokes_after(positions.last_sent_position)
        .iter()
        .map(map)
        .collect();
    if pending.is_empty() {
        return None;
    }
    model.mark_sent();
    positions.last_sent_position = model.positions.last_sent_position;
    Some(pending)
}
