//! Built-in intent map, knowledge base, voices and canned phrases.

use serde::{Deserialize, Serialize};

use super::voice::VoiceOption;

/// Intent map entry: spoken keyword → destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEntry {
    pub keyword: String,
    pub url: String,
}

/// A favourite app checked ahead of the generic rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    /// Name spoken back in the confirmation.
    pub label: String,
    pub triggers: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub topic: String,
    pub answer: String,
}

pub const SPOTIFY_HOME: &str = "https://open.spotify.com";
pub const SPOTIFY_SEARCH: &str = "https://open.spotify.com/search/";
pub const GOOGLE_HOME: &str = "https://www.google.com";
pub const GOOGLE_SEARCH: &str = "https://www.google.com/search?q=";
pub const YOUTUBE_HOME: &str = "https://www.youtube.com";
pub const YOUTUBE_SEARCH: &str = "https://www.youtube.com/results?search_query=";

pub const FALLBACK_MESSAGE: &str = "I'm not sure how to help with that. Try asking me to open an app like YouTube or Instagram, or search for something on Google.";
pub const APOLOGY_MESSAGE: &str = "Sorry, I couldn't process that command.";
pub const WEATHER_MESSAGE: &str = "I'd love to help with weather, but I need access to weather data. Try asking me to open a weather website!";
pub const THANKS_MESSAGE: &str = "You're welcome! Happy to help anytime.";
pub const GOODBYE_MESSAGE: &str = "Goodbye! Have a great day!";
pub const EMPTY_QUESTION_MESSAGE: &str = "What would you like to know about?";

fn entry(keyword: &str, url: &str) -> IntentEntry {
    IntentEntry {
        keyword: keyword.to_string(),
        url: url.to_string(),
    }
}

fn topic(topic: &str, answer: &str) -> Topic {
    Topic {
        topic: topic.to_string(),
        answer: answer.to_string(),
    }
}

/// Order matters: the first keyword contained in a command wins.
pub fn default_intents() -> Vec<IntentEntry> {
    vec![
        entry("instagram", "https://www.instagram.com"),
        entry("youtube", YOUTUBE_HOME),
        entry("facebook", "https://www.facebook.com"),
        entry("gmail", "https://mail.google.com"),
        entry("spotify", SPOTIFY_HOME),
        entry("google", GOOGLE_HOME),
        entry("twitter", "https://www.twitter.com"),
        entry("linkedin", "https://www.linkedin.com"),
        entry("netflix", "https://www.netflix.com"),
        entry("amazon", "https://www.amazon.com"),
        entry("reddit", "https://www.reddit.com"),
        entry("github", "https://www.github.com"),
        entry("stackoverflow", "https://stackoverflow.com"),
        entry("wikipedia", "https://www.wikipedia.org"),
        entry("fitbuddy", "https://fit-buddy-ai.vercel.app/"),
        entry("fit buddy", "https://fit-buddy-ai.vercel.app/"),
    ]
}

pub fn default_shortcuts() -> Vec<Shortcut> {
    vec![Shortcut {
        label: "FitBuddy".to_string(),
        triggers: vec!["fit buddy".to_string(), "fitbuddy".to_string()],
        url: "https://fit-buddy-ai.vercel.app/".to_string(),
    }]
}

pub fn default_knowledge() -> Vec<Topic> {
    vec![
        topic(
            "fitness",
            "Fitness refers to the state of being physically fit and healthy. It involves regular physical activity, proper nutrition, adequate rest, and maintaining a healthy lifestyle. Fitness components include cardiovascular endurance, muscular strength, muscular endurance, flexibility, and body composition.",
        ),
        topic(
            "exercise",
            "Exercise is physical activity that is planned, structured, and repetitive with the purpose of improving or maintaining physical fitness. Regular exercise has numerous benefits including improved cardiovascular health, stronger muscles and bones, weight management, better mental health, and reduced risk of chronic diseases.",
        ),
        topic(
            "healthy diet",
            "A healthy diet is one that helps maintain or improve overall health by providing the body with essential nutrition. It contains a balanced mix of macronutrients (proteins, carbohydrates, and fats) and micronutrients (vitamins and minerals). A healthy diet typically includes fruits, vegetables, whole grains, lean proteins, and limits processed foods, added sugars, and unhealthy fats.",
        ),
        topic(
            "meditation",
            "Meditation is a practice where an individual uses techniques like mindfulness or focusing the mind on a particular object, thought, or activity to train attention and awareness. This practice often leads to a mentally clear and emotionally calm and stable state. Regular meditation can reduce stress, improve concentration, increase self-awareness, and promote emotional health.",
        ),
        topic(
            "yoga",
            "Yoga is a group of physical, mental, and spiritual practices that originated in ancient India. It combines physical postures, breathing exercises, and meditation. Regular practice of yoga can improve flexibility, strength, balance, and reduce stress and anxiety.",
        ),
        topic(
            "artificial intelligence",
            "Artificial Intelligence, or AI, refers to systems or machines that mimic human intelligence to perform tasks and can iteratively improve themselves based on the information they collect. AI encompasses various technologies including machine learning, natural language processing, computer vision, and robotics. It's used in numerous applications from virtual assistants to autonomous vehicles.",
        ),
        topic(
            "blockchain",
            "Blockchain is a distributed ledger technology that maintains a continuously growing list of records, called blocks, which are linked and secured using cryptography. Each block contains a timestamp and transaction data, making the system resistant to modification. Blockchain is the foundation of cryptocurrencies like Bitcoin but has applications in many fields including supply chain, healthcare, and voting systems.",
        ),
        topic(
            "climate change",
            "Climate change refers to long-term shifts in temperatures and weather patterns, primarily caused by human activities, especially the burning of fossil fuels which increases heat-trapping greenhouse gases. Effects include rising sea levels, extreme weather events, and disruptions to ecosystems. Addressing climate change requires reducing greenhouse gas emissions and adapting to its impacts.",
        ),
        topic(
            "renewable energy",
            "Renewable energy comes from sources that are naturally replenished on a human timescale, such as sunlight, wind, rain, tides, waves, and geothermal heat. Unlike fossil fuels, renewable energy sources won't run out and generally have a much lower environmental impact. Common types include solar, wind, hydroelectric, biomass, and geothermal power.",
        ),
    ]
}

/// The first entry is the startup voice.
pub fn default_voices() -> Vec<VoiceOption> {
    vec![
        VoiceOption::new("Default", "en-US"),
        VoiceOption::new("British", "en-GB"),
        VoiceOption::new("Australian", "en-AU"),
        VoiceOption::new("Indian", "en-IN"),
        VoiceOption::new("Spanish", "es-ES"),
        VoiceOption::new("French", "fr-FR"),
        VoiceOption::new("German", "de-DE"),
        VoiceOption::new("Italian", "it-IT"),
        VoiceOption::new("Japanese", "ja-JP"),
        VoiceOption::new("Korean", "ko-KR"),
    ]
}

pub fn default_greetings() -> Vec<String> {
    [
        "Hello! How can I help you today?",
        "Hi there! What can I do for you?",
        "Good to see you! How can I assist?",
        "Hello! Ready to help you out.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
