// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Translates OS signals into supervisor lifecycle events.
//!
//! INT and TERM request a graceful stop; USR1 (Unix) / CTRL_BREAK (Windows)
//! fire a status-snapshot callback without stopping anything.

use tokio_util::sync::CancellationToken;

/// Spawns the signal-listening task. `stop` is cancelled on INT/TERM;
/// `on_status_snapshot` is invoked, possibly repeatedly, on USR1/CTRL_BREAK.
/// The task exits on its own once `stop` is cancelled by any source.
pub fn install(stop: CancellationToken, on_status_snapshot: impl Fn() + Send + Sync + 'static) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let Ok(mut term) = signal(SignalKind::terminate()) else { return };
            let Ok(mut usr1) = signal(SignalKind::user_defined1()) else { return };
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => { stop.cancel(); break; }
                    _ = term.recv() => { stop.cancel(); break; }
                    _ = usr1.recv() => { on_status_snapshot(); }
                    () = stop.cancelled() => break,
                }
            }
        }
        #[cfg(windows)]
        {
            let Ok(mut ctrl_break) = tokio::signal::windows::ctrl_break() else { return };
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => { stop.cancel(); break; }
                    _ = ctrl_break.recv() => { on_status_snapshot(); }
                    () = stop.cancelled() => break,
                }
            }
        }
    });
}
