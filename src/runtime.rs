//! Runtime abstraction layer for timers and deferred work
//!
//! The engine runs on the UI thread and needs two primitives from the host
//! runtime: a non-blocking delay, and a way to run work on a later turn of
//! the event loop. Tokio provides the delay natively, the browser both
//! through `setTimeout` and its microtask queue.

use futures::future::{self, Either};
use std::future::Future;
use std::time::Duration;

/// Runtime-agnostic async delay
pub async fn delay(duration: Duration) {
    #[cfg(feature = "tokio-runtime")]
    {
        tokio::time::sleep(duration).await;
    }

    #[cfg(all(feature = "wasm", not(feature = "tokio-runtime")))]
    {
        wasm_delay(duration).await;
    }

    #[cfg(not(any(feature = "tokio-runtime", feature = "wasm")))]
    {
        // No timer available: never fires, so timeouts degrade to unbounded waits
        log::warn!("no async timer available; delay of {:?} never completes", duration);
        future::pending::<()>().await;
    }
}

/// Await `fut`, giving up after `duration`. `None` means the deadline won.
pub async fn timeout<F>(duration: Duration, fut: F) -> Option<F::Output>
where
    F: Future,
{
    let fut = Box::pin(fut);
    let deadline = Box::pin(delay(duration));

    match future::select(fut, deadline).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(((), _)) => None,
    }
}

/// Run `task` on a later turn of the local event loop.
///
/// Returns false when the host has no local executor to hand it to (native
/// builds); the caller then relies on the host polling instead.
pub fn spawn_local<F>(task: F) -> bool
where
    F: Future<Output = ()> + 'static,
{
    #[cfg(all(feature = "wasm", target_arch = "wasm32"))]
    {
        wasm_bindgen_futures::spawn_local(task);
        true
    }

    #[cfg(not(all(feature = "wasm", target_arch = "wasm32")))]
    {
        drop(task);
        false
    }
}

#[cfg(all(feature = "wasm", not(feature = "tokio-runtime")))]
async fn wasm_delay(duration: Duration) {
    use wasm_bindgen::JsCast;

    let millis = duration.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window().map(|window| {
            window.set_timeout_with_callback_and_timeout_and_arguments_0(
                resolve.unchecked_ref(),
                millis,
            )
        });
        if !matches!(scheduled, Some(Ok(_))) {
            log::warn!("setTimeout unavailable; delay resolves immediately");
            let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

#[cfg(all(test, feature = "tokio-runtime"))]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_lets_fast_future_win() {
        let result = timeout(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(result, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_expires_on_pending_future() {
        let result = timeout(Duration::from_millis(50), future::pending::<u8>()).await;
        assert_eq!(result, None);
    }

    #[test]
    fn test_spawn_local_without_executor() {
        let ran = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = ran.clone();
        assert!(!spawn_local(async move { flag.set(true) }));
        assert!(!ran.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_advances_clock() {
        let start = tokio::time::Instant::now();
        delay(Duration::from_millis(250)).await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
