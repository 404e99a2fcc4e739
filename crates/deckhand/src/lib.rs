//! Deckhand - Paper-to-Media Content Studio
//!
//! Retrieval-augmented generation of slide outlines and speech scripts from
//! research papers: a flat-file embedding store with cosine ranking, plus
//! cancellable single-flight pipelines for crawling and generation.

pub mod arxiv;
pub mod backend;
pub mod commands;
pub mod config;
pub mod crawler;
pub mod embedder;
pub mod embeddings;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod record;
pub mod retrieval;
pub mod similarity;
pub mod storage;
