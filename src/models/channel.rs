// src/models/channel.rs
//! Channel profiles - per-channel identity and prompt fragments that steer
//! script, visual and thumbnail generation.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// A channel profile groups the reusable prompt fragments for one YouTube
/// channel. Projects keep a denormalized `channelId` reference; deleting a
/// profile does not touch existing projects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelProfile {
    pub id: String,
    pub name: String,
    pub description: String,

    #[serde(rename = "scriptPrompt")]
    pub script_prompt: String,
    #[serde(rename = "imageGenPrompt")]
    pub image_gen_prompt: String,
    #[serde(rename = "thumbnailPrompt")]
    pub thumbnail_prompt: String,

    /// Optional reference image (data URI) used to guide thumbnail styling.
    #[serde(rename = "thumbnailRefImage", skip_serializing_if = "Option::is_none")]
    pub thumbnail_ref_image: Option<String>,
}

lazy_static! {
    /// Built-in profiles returned whenever the store has no channels yet.
    pub static ref DEFAULT_CHANNELS: Vec<ChannelProfile> = vec![
        ChannelProfile {
            id: "ch_tech".to_string(),
            name: "Tech Futurist".to_string(),
            description: "Deep dives into AI, Robotics, and Space.".to_string(),
            script_prompt: "Role: Lead scriptwriter for \"Tech Futurist\".\n\
                Tone: Excited, visionary, fast-paced.\n\
                Structure: Hook (0:00-0:45), Intro (0:45-1:30), 3 Main Points, Conclusion/CTA.\n\
                Requirements: Use analogies to explain complex tech. Keep sentences punchy."
                .to_string(),
            image_gen_prompt: "Visual Style: Cyberpunk, high contrast, neon blue and purple \
                lighting, futuristic UI overlays, cinematic depth of field.\n\
                Scenes: Show robots, data centers, holograms, and space exploration.\n\
                Quality: 8k, Unreal Engine 5 render style."
                .to_string(),
            thumbnail_prompt: "Style: High CTR, shocking comparison or \"Future is Here\" vibe.\n\
                Text Overlay: Big, bold, sans-serif font (Yellow or White). Max 3 words.\n\
                Concept: Split screen contrasting old vs new, or a robot doing something human."
                .to_string(),
            thumbnail_ref_image: None,
        },
        ChannelProfile {
            id: "ch_mystery".to_string(),
            name: "Unsolved Files".to_string(),
            description: "True crime and paranormal mysteries.".to_string(),
            script_prompt: "Role: Storyteller for \"Unsolved Files\".\n\
                Tone: Suspenseful, dark, slow-paced, serious, investigative.\n\
                Structure: Cold Open (Scary fact), The Backstory, The Incident, Theories, \
                Unsettling Conclusion.\n\
                Requirements: Build tension gradually. Use rhetorical questions."
                .to_string(),
            image_gen_prompt: "Visual Style: Film noir, shadowy, desaturated colors, grain \
                effect, realistic 35mm photography.\n\
                Scenes: Crime scenes (non-gory), misty forests, abandoned houses, old documents."
                .to_string(),
            thumbnail_prompt: "Style: Mysterious, dark background with one highlighted subject. \
                Red circles or arrows pointing to clues.\n\
                Text Overlay: Gritty, distressed font. Questions like \"WHO?\" or \"WHY?\"."
                .to_string(),
            thumbnail_ref_image: None,
        },
        ChannelProfile {
            id: "ch_money".to_string(),
            name: "Passive Income OS".to_string(),
            description: "Finance and side hustles.".to_string(),
            script_prompt: "Role: Financial analyst for \"Passive Income OS\".\n\
                Tone: Professional, trustworthy, actionable, direct, no-fluff.\n\
                Structure: Problem (The Trap), The Opportunity, Step-by-Step Guide, Risks, Payoff.\n\
                Requirements: Focus on numbers and ROI. Use \"You\" frequently."
                .to_string(),
            image_gen_prompt: "Visual Style: Clean, minimalist, bright lighting, \"Corporate \
                Memphis\" 3D style or high-quality stock footage look.\n\
                Scenes: Laptops, graphs going up, money piles, clean desk setups."
                .to_string(),
            thumbnail_prompt: "Style: Bright background (Green or Blue). Expressive face holding \
                money or pointing at a chart.\n\
                Text Overlay: Green numbers (e.g., \"$10,000/Mo\"). Bold Impact font."
                .to_string(),
            thumbnail_ref_image: None,
        },
    ];
}
