//! JSON codec bound to the request body and response sink
//!
//! The context never talks to `serde_json` directly: it holds a [`Decoder`]
//! over the collected request body and an [`Encoder`] that writes into the
//! response sink, both produced by [`JsonCodec`].

use crate::error::{Error, Result};
use crate::http::ResponseWriter;
use hyper::body::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;

pub struct JsonCodec;

impl JsonCodec {
    /// Media type used for the `Content-Type` of successful responses
    pub const MEDIA_TYPE: &'static str = "application/json";

    pub fn decoder(body: Bytes) -> Decoder {
        Decoder { body, offset: 0 }
    }

    pub fn encoder() -> Encoder {
        Encoder
    }
}

/// Streaming decoder over a request body
///
/// Each call to [`Decoder::decode`] reads the next JSON value, so a body of
/// several concatenated values can be read one after another.
#[derive(Debug, Default)]
pub struct Decoder {
    body: Bytes,
    offset: usize,
}

impl Decoder {
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<T> {
        let remaining = &self.body[self.offset..];
        let mut stream = serde_json::Deserializer::from_slice(remaining).into_iter::<T>();

        match stream.next() {
            Some(Ok(value)) => {
                self.offset += stream.byte_offset();
                Ok(value)
            }
            Some(Err(e)) => {
                // A broken value cannot be resynchronized; drop the rest.
                self.offset = self.body.len();
                Err(Error::from(e))
            }
            None => Err(Error::decode("EOF: request body has no more JSON values")),
        }
    }

    /// Bytes not consumed by previous decodes
    pub fn remaining(&self) -> &[u8] {
        &self.body[self.offset..]
    }
}

/// Encoder writing JSON into the response sink
#[derive(Debug, Default, Clone, Copy)]
pub struct Encoder;

impl Encoder {
    /// Serialize `value` fully before writing, so a failed encode leaves the
    /// sink untouched
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T, sink: &mut ResponseWriter) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))?;
        sink.write_all(&bytes)?;
        Ok(())
    }
}
