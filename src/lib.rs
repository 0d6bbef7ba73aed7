//! Core library for Createathon - API client, models, session, auth.
//!
//! Createathon is a coding-challenge platform: users register and log in,
//! browse and author challenges, submit solutions that are graded
//! server-side, track progress and achievements, and view a leaderboard.
//! This crate is the non-UI core a front end builds on:
//!
//! - [`auth::CredentialStore`]: durable storage for the access token,
//!   refresh token and language preference
//! - [`api::ApiClient`]: the authenticated request pipeline (token
//!   attach, transparent refresh-on-401) plus typed endpoint methods
//! - [`auth::SessionController`]: login/register/logout and the in-memory
//!   record of the current user
//! - [`poll::Poller`]: fixed-interval background refresh for views that
//!   poll (discussions, dashboard stats)

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod poll;
