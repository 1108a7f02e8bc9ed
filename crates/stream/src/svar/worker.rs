//! Worker tasks: one producer continuation per task
//!
//! A worker repeatedly steps its stream under the SVar context and
//! delivers what it yields. The consumer side owns the scheduler; a
//! worker holds only a weak reference and takes a strong handle one
//! iteration at a time, so an abandoned consumer tears the whole
//! structure down as soon as the workers let go.
//!
//! User code runs inside the step, so a panic there is caught at this
//! boundary and posted as an error event; otherwise the accounting would
//! never see the worker exit and the consumer would wait forever.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Weak;

use braid_common::StreamError;
use futures::FutureExt;

use super::{Delivery, SVar};
use crate::stream::{Next, Stream};

pub(super) async fn run<T: Send + 'static>(sv: Weak<SVar<T>>, id: u64, mut stream: Stream<T>) {
    loop {
        // The consumer dropped the SVar: abandon the branch. Dropping the
        // remaining stream runs its release guards.
        let Some(var) = sv.upgrade() else { return };
        if var.is_closed() {
            return;
        }
        let step = AssertUnwindSafe(stream.advance(Some(var.clone())))
            .catch_unwind()
            .await;
        match step {
            Ok(Ok(Next::Stop)) => {
                var.child_stop(id);
                return;
            }
            Ok(Ok(Next::Single(x))) => {
                match var.send_value(x) {
                    Delivery::Delivered => var.child_stop(id),
                    // Fold the element back into a parked continuation so
                    // the bound stays strict and nothing is lost.
                    Delivery::Full(x) => var.park(Stream::once(x), id),
                    Delivery::Closed => {}
                }
                return;
            }
            Ok(Ok(Next::Yield(x, tail))) => match var.send_value(x) {
                Delivery::Delivered => stream = tail,
                Delivery::Full(x) => {
                    var.park(Stream::cons(x, tail), id);
                    return;
                }
                Delivery::Closed => return,
            },
            Ok(Err(e)) => {
                var.send_error(e, id);
                return;
            }
            Err(payload) => {
                var.send_error(StreamError::user(panic_message(payload.as_ref())), id);
                return;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "stream step panicked".to_string()
    }
}
