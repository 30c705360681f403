//! `Future` implementation for [`TaskHandle`].

use crate::error::Result;
use crate::handle::TaskHandle;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The sender completes the slot and takes the waker under this same
        // lock, so registering here cannot race with completion.
        let mut inner = self.slot.inner.lock();
        match inner.state.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                let waker = cx.waker();
                if !inner.waker.as_ref().is_some_and(|w| w.will_wake(waker)) {
                    inner.waker = Some(waker.clone());
                }
                Poll::Pending
            }
        }
    }
}
