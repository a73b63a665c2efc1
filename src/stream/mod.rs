//! Streaming chat-response assembly.
//!
//! A bot reply arrives as newline-delimited `data:` frames split at
//! arbitrary offsets. The pipeline for one turn is, leaves first:
//!
//! - `decoder`: [`FrameDecoder`](decoder::FrameDecoder) turns chunks into
//!   complete lines, buffering the trailing partial line.
//! - `frame`: [`FramePayloadParser`](frame::FramePayloadParser) classifies a
//!   line and extracts its text fragment.
//! - `accumulator`: [`TextAccumulator`](accumulator::TextAccumulator) appends
//!   fragments in arrival order.
//! - `directive`: [`DirectiveExtractor`](directive::DirectiveExtractor)
//!   derives the display text and directive state from the whole raw text.
//! - `session`: [`StreamSession`](session::StreamSession) owns the pipeline
//!   and the turn's lifecycle.
//! - `reader`: async pump driving a session from an `AsyncRead`.

pub mod accumulator;
pub mod decoder;
pub mod directive;
pub mod frame;
pub mod reader;
pub mod session;
