/// Type-state markers for the builder pattern
///
/// These types are used to track which fields have been set
/// in the builder at compile-time, preventing invalid configurations.

use std::marker::PhantomData;

/// Marker trait for URL state
pub trait UrlState {}

/// URL has not been set
pub struct NoUrl;
impl UrlState for NoUrl {}

/// URL has been set
pub struct HasUrl;
impl UrlState for HasUrl {}

/// Marker trait for decoder state
pub trait DecoderState {}

/// Decoder has not been set
pub struct NoDecoder;
impl DecoderState for NoDecoder {}

/// Decoder has been set
pub struct HasDecoder;
impl DecoderState for HasDecoder {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<U, D> {
    _url: PhantomData<U>,
    _decoder: PhantomData<D>,
}

impl<U, D> TypeState<U, D> {
    pub(crate) fn new() -> Self {
        Self {
            _url: PhantomData,
            _decoder: PhantomData,
        }
    }
}

impl<U, D> Default for TypeState<U, D> {
    fn default() -> Self {
        Self::new()
    }
}
