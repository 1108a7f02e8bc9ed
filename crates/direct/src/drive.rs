//! Driving loops over direct streams

use std::cmp::Ordering;
use std::future::Future;

use braid_common::Result;

use crate::stream::{Direct, Step};

/// Pull the next element, stepping through skips.
pub async fn next<D>(d: &mut D) -> Result<Option<D::Item>>
where
    D: Direct,
{
    loop {
        match d.step().await? {
            Step::Yield(x) => return Ok(Some(x)),
            Step::Skip => continue,
            Step::Stop => return Ok(None),
        }
    }
}

/// Strict left fold.
pub async fn fold<D, B, F>(mut d: D, init: B, mut f: F) -> Result<B>
where
    D: Direct,
    B: Send,
    F: FnMut(B, D::Item) -> B + Send,
{
    let mut acc = init;
    while let Some(x) = next(&mut d).await? {
        acc = f(acc, x);
    }
    Ok(acc)
}

/// Strict left fold with an effectful step.
pub async fn fold_async<D, B, F, Fut>(mut d: D, init: B, mut f: F) -> Result<B>
where
    D: Direct,
    B: Send,
    F: FnMut(B, D::Item) -> Fut + Send,
    Fut: Future<Output = Result<B>> + Send,
{
    let mut acc = init;
    while let Some(x) = next(&mut d).await? {
        acc = f(acc, x).await?;
    }
    Ok(acc)
}

/// Run the stream to completion, discarding elements.
pub async fn drain<D>(mut d: D) -> Result<()>
where
    D: Direct,
{
    while next(&mut d).await?.is_some() {}
    Ok(())
}

/// Collect all elements in order.
pub async fn to_vec<D>(d: D) -> Result<Vec<D::Item>>
where
    D: Direct,
{
    fold(d, Vec::new(), |mut acc, x| {
        acc.push(x);
        acc
    })
    .await
}

/// Element-wise equality under `eq`; lengths must match too.
pub async fn eq_by<A, B, F>(mut a: A, mut b: B, mut eq: F) -> Result<bool>
where
    A: Direct,
    B: Direct,
    F: FnMut(&A::Item, &B::Item) -> bool + Send,
{
    loop {
        match (next(&mut a).await?, next(&mut b).await?) {
            (Some(x), Some(y)) => {
                if !eq(&x, &y) {
                    return Ok(false);
                }
            }
            (None, None) => return Ok(true),
            _ => return Ok(false),
        }
    }
}

/// Lexicographic comparison under `cmp`; a prefix orders before its
/// extension.
pub async fn cmp_by<A, B, F>(mut a: A, mut b: B, mut cmp: F) -> Result<Ordering>
where
    A: Direct,
    B: Direct,
    F: FnMut(&A::Item, &B::Item) -> Ordering + Send,
{
    loop {
        match (next(&mut a).await?, next(&mut b).await?) {
            (Some(x), Some(y)) => match cmp(&x, &y) {
                Ordering::Equal => continue,
                other => return Ok(other),
            },
            (None, None) => return Ok(Ordering::Equal),
            (None, Some(_)) => return Ok(Ordering::Less),
            (Some(_), None) => return Ok(Ordering::Greater),
        }
    }
}
