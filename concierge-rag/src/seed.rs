//! Built-in seed corpus for bootstrap and demo ingestion.
//!
//! Used when an ingestion request carries no documents but sets the seed
//! flag; this is an explicit convenience path, not a silent default.

use std::collections::HashMap;

use crate::document::Document;

fn seed(id: &str, title: &str, doc_type: &str, text: &str) -> Document {
    let mut metadata = HashMap::new();
    metadata.insert("title".to_string(), title.to_string());
    metadata.insert("type".to_string(), doc_type.to_string());
    Document { id: Some(id.to_string()), text: text.to_string(), metadata }
}

/// The built-in seed documents describing the business.
pub fn seed_documents() -> Vec<Document> {
    vec![
        seed(
            "seed-services",
            "Our Services",
            "page",
            "We offer three core services: smart automation of repetitive \
             business workflows, AI-assisted digital marketing campaigns, and \
             hands-on advisory for adopting artificial intelligence. Every \
             engagement starts with a short discovery call to scope the work.",
        ),
        seed(
            "seed-benefits",
            "Why Choose Us",
            "page",
            "Clients choose us for three reasons: time savings from automating \
             manual processes, broader reach through data-driven campaigns, and \
             easy adoption — we integrate with the tools your team already uses \
             rather than replacing them.",
        ),
        seed(
            "seed-getting-started",
            "Getting Started",
            "docs",
            "To get started, book an introductory consultation through the \
             contact form. We respond within one business day, prepare a short \
             assessment of your current workflows, and propose a pilot project \
             you can evaluate within two to four weeks.",
        ),
        seed(
            "seed-pricing",
            "Pricing",
            "docs",
            "Pilot projects are offered at a fixed price agreed up front. \
             Ongoing engagements are billed monthly with no long-term lock-in; \
             you can pause or stop at the end of any month. Advisory sessions \
             are available as hourly bookings.",
        ),
        seed(
            "seed-contact",
            "Contact",
            "page",
            "You can reach the team through the contact form on the website. \
             Include your name, email, and a short description of your needs. \
             For existing clients, the fastest channel is the shared project \
             workspace set up during onboarding.",
        ),
        seed(
            "seed-faq",
            "Frequently Asked Questions",
            "docs",
            "Do we need our own AI expertise? No — we handle the technical \
             setup and train your team. Which industries do you serve? We work \
             with companies of all sizes, from local businesses to mid-market \
             firms. Can we keep our existing tools? Yes, integrations are \
             preferred over replacements.",
        ),
    ]
}
