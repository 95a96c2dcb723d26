// src/contributors.rs

use crate::model::CommitRecord;
use palette::{FromColor, Lch, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Uniquely identifies a contributor, in first-seen order
pub type ContributorId = usize;

const SYMBOLS: [char; 12] = ['●', '◆', '▲', '■', '★', '✦', '◉', '⬟', '◈', '⬡', '◇', '▼'];

/// Contributors beyond this many share hues picked from their email hash
const DISTINCT_HUES: usize = 12;

/// A contributor and the visual identity assigned to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Contributor {
    pub id: ContributorId,
    pub name: String,
    pub email: String,
    pub color: [u8; 3],
    pub symbol: char,
}

/// Tracks every author seen in the history, keyed by email.
#[derive(Debug, Default)]
pub struct ContributorRegistry {
    by_email: HashMap<String, ContributorId>,
    contributors: Vec<Contributor>,
}

impl ContributorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every author of `commits` in history order.
    pub fn from_history(commits: &[CommitRecord]) -> Self {
        let mut registry = Self::new();
        for commit in commits {
            registry.register(&commit.author_name, &commit.author_email);
        }
        registry
    }

    /// Returns the existing handle for `email`, or assigns a new identity.
    pub fn register(&mut self, name: &str, email: &str) -> ContributorId {
        if let Some(&id) = self.by_email.get(email) {
            return id;
        }
        let id = self.contributors.len();
        self.contributors.push(Contributor {
            id,
            name: name.to_string(),
            email: email.to_string(),
            color: color_for(email, id),
            symbol: SYMBOLS[id % SYMBOLS.len()],
        });
        self.by_email.insert(email.to_string(), id);
        id
    }

    pub fn lookup(&self, email: &str) -> Option<&Contributor> {
        self.by_email.get(email).map(|&id| &self.contributors[id])
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contributor> {
        self.contributors.iter()
    }
}

fn color_for(email: &str, index: usize) -> [u8; 3] {
    let hue = if index < DISTINCT_HUES {
        index as f32 * (360.0 / DISTINCT_HUES as f32)
    } else {
        // Seeded by the email so the color survives restarts
        let mut rng = StdRng::seed_from_u64(fnv1a(email.as_bytes()));
        rng.gen_range(0.0f32..360.0f32)
    };
    let color = Lch::new(70.0f32, 60.0f32, hue);
    let srgb: Srgb<f32> = Srgb::from_color(color);
    let (r, g, b) = srgb.into_components();
    [to_u8(r), to_u8(g), to_u8(b)]
}

fn to_u8(component: f32) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
