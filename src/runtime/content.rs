//! Static lesson content for both flows
//!
//! Everything here is compile-time data: narration lines, lesson sections,
//! and the two quiz banks.

use serde::Serialize;

use super::quiz::{Question, QuizOption};
use super::stage::FlowKind;

/// A lesson section or slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LessonSection {
    /// Section number
    pub id: u32,
    /// Heading
    pub title: &'static str,
    /// Narrated body text
    pub content: &'static str,
}

/// Everything one flow narrates
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FlowContent {
    /// Lesson title
    pub title: &'static str,
    /// Spoken on the welcome stage
    pub introduction: &'static str,
    /// Shown under the title on the welcome stage
    pub welcome_message: &'static str,
    /// Spoken on the ready stage (builder flow only)
    pub ready: &'static str,
    /// Lesson sections in order
    pub sections: &'static [LessonSection],
    /// Spoken on the quiz-intro stage (guided flow only)
    pub quiz_intro: &'static str,
    /// Spoken when assembly starts (builder flow only)
    pub assembly_instructions: &'static str,
    /// Spoken once every part is placed (builder flow only)
    pub assembly_complete: &'static str,
    /// Quiz bank
    pub questions: &'static [Question],
}

/// Content for `flow`
pub fn for_flow(flow: FlowKind) -> &'static FlowContent {
    match flow {
        FlowKind::Guided => &GUIDED,
        FlowKind::Builder => &BUILDER,
    }
}

/// Webcam caption for the welcome stage (guided flow)
pub const GREETING_WELCOME: &str =
    "Mission control activated! I can see you're ready for your space adventure!";
/// Webcam caption for the first lesson section
pub const GREETING_LESSON_FIRST: &str = "Look at you! You're learning about satellites already!";
/// Webcam caption for the last lesson section
pub const GREETING_LESSON_LAST: &str =
    "You've learned so much! You're looking like a real astronaut now!";
/// Webcam captions rotated through the middle lesson sections
pub const GREETINGS_LESSON_MIDDLE: &[&str] = &[
    "You're doing great! Keep exploring space with me!",
    "I can see a future astronaut in my camera!",
    "Your space journey is going wonderfully!",
    "Keep up the good work, space cadet!",
];
/// Webcam caption for the quiz stages
pub const GREETING_QUIZ: &str =
    "Time to test your space knowledge! I can see you're ready for the challenge!";

/// Caption for a lesson section at `index` of `count`
///
/// Middle sections rotate through the encouragement list by index.
pub fn lesson_greeting(index: usize, count: usize) -> &'static str {
    if index == 0 {
        GREETING_LESSON_FIRST
    } else if index + 1 >= count {
        GREETING_LESSON_LAST
    } else {
        GREETINGS_LESSON_MIDDLE[(index - 1) % GREETINGS_LESSON_MIDDLE.len()]
    }
}

const fn opt(id: char, text: &'static str) -> QuizOption {
    QuizOption { id, text }
}

static GUIDED_SECTIONS: [LessonSection; 4] = [
    LessonSection {
        id: 1,
        title: "What is a Satellite?",
        content: "A satellite is an object that orbits around a planet or a star. Satellites can be natural, like our Moon orbiting Earth, or artificial, which are the ones humans build and launch into space. Artificial satellites help us with communication, weather forecasting, navigation, and exploring our universe!",
    },
    LessonSection {
        id: 2,
        title: "Satellite Components",
        content: "Every satellite needs certain key parts to function in space. The main components include: 1) Power Source - usually solar panels that convert sunlight into electricity; 2) Communication System - antennas to send and receive signals; 3) Attitude Control - to keep the satellite pointing in the right direction; 4) Scientific Instruments - special tools to collect data or take pictures, depending on the satellite's mission.",
    },
    LessonSection {
        id: 3,
        title: "Satellite Orbits",
        content: "Satellites travel in paths called orbits around Earth. Low Earth Orbit or LEO satellites circle about 160 to 2,000 kilometers above Earth. They complete an orbit in just 90 minutes! Geostationary satellites orbit much higher, about 36,000 kilometers up, and move at the same speed Earth rotates, so they stay above the same spot on Earth all the time. These are great for communication and weather monitoring.",
    },
    LessonSection {
        id: 4,
        title: "Satellite Missions",
        content: "Satellites have different jobs or missions. Communication satellites help people talk to each other across the world and broadcast TV shows. Weather satellites take pictures of clouds and storms to help predict the weather. Navigation satellites, like GPS, help us find our way around. And scientific satellites, like space telescopes, help us study planets, stars, and galaxies!",
    },
];

static GUIDED_QUESTIONS: [Question; 5] = [
    Question {
        id: 1,
        prompt: "What orbits around a planet or star?",
        options: &[
            opt('a', "A satellite"),
            opt('b', "A spaceship"),
            opt('c', "A meteor"),
            opt('d', "A comet"),
        ],
        correct: 'a',
        explanation: "A satellite is an object that orbits around a planet or star. It can be natural (like the Moon) or artificial (built by humans).",
    },
    Question {
        id: 2,
        prompt: "Which of these is NOT a main component of a satellite?",
        options: &[
            opt('a', "Power source"),
            opt('b', "Communication system"),
            opt('c', "Dining area"),
            opt('d', "Scientific instruments"),
        ],
        correct: 'c',
        explanation: "Satellites don't have dining areas! They need power sources, communication systems, attitude control, and scientific instruments to function.",
    },
    Question {
        id: 3,
        prompt: "Which satellite orbit is the highest above Earth?",
        options: &[
            opt('a', "Low Earth Orbit (LEO)"),
            opt('b', "Geostationary Orbit"),
            opt('c', "Middle Earth Orbit"),
            opt('d', "Polar Orbit"),
        ],
        correct: 'b',
        explanation: "Geostationary satellites orbit about 36,000 kilometers above Earth, much higher than LEO satellites which orbit at 160-2,000 kilometers.",
    },
    Question {
        id: 4,
        prompt: "What do weather satellites help us do?",
        options: &[
            opt('a', "Cook food"),
            opt('b', "Predict the weather"),
            opt('c', "Talk to aliens"),
            opt('d', "Power our homes"),
        ],
        correct: 'b',
        explanation: "Weather satellites take pictures of clouds and weather patterns to help meteorologists predict the weather.",
    },
    Question {
        id: 5,
        prompt: "What helps satellites generate power in space?",
        options: &[
            opt('a', "Batteries only"),
            opt('b', "Nuclear reactors"),
            opt('c', "Solar panels"),
            opt('d', "Rocket fuel"),
        ],
        correct: 'c',
        explanation: "Most satellites use solar panels to convert sunlight into electricity, which powers all the satellite's systems.",
    },
];

static BUILDER_SECTIONS: [LessonSection; 6] = [
    LessonSection {
        id: 1,
        title: "What is a Satellite?",
        content: "A satellite is a moon, planet or machine that orbits a planet or star. Satellites help us in many ways, like predicting weather, taking pictures of Earth, and helping people navigate.",
    },
    LessonSection {
        id: 2,
        title: "Solar Panels",
        content: "Solar panels are like wings that collect energy from the sun. They convert sunlight into electricity to power all the equipment on the satellite. Without solar panels, satellites wouldn't have energy to work!",
    },
    LessonSection {
        id: 3,
        title: "Antenna",
        content: "The antenna is like the satellite's ears and mouth. It receives signals from Earth and sends information back. This lets the satellite talk to people on Earth and share what it discovers in space.",
    },
    LessonSection {
        id: 4,
        title: "Camera",
        content: "Satellites use special cameras to take pictures of Earth, other planets, or even distant stars and galaxies. These pictures help scientists learn about weather, forests, oceans, and even discover new things in space!",
    },
    LessonSection {
        id: 5,
        title: "Power Supply",
        content: "The power supply is like the satellite's heart. It stores energy collected by the solar panels and distributes it to all the parts of the satellite when they need it. It makes sure everything has the power to work properly.",
    },
    LessonSection {
        id: 6,
        title: "Satellite Body",
        content: "The satellite body, or bus, is the main structure that holds all the parts together. It protects the delicate instruments inside from the harsh conditions of space, like extreme temperatures and space debris.",
    },
];

static BUILDER_QUESTIONS: [Question; 5] = [
    Question {
        id: 1,
        prompt: "What do solar panels on a satellite do?",
        options: &[
            opt('a', "Send messages to Earth"),
            opt('b', "Take pictures of stars"),
            opt('c', "Collect energy from the Sun"),
            opt('d', "Protect the satellite from space junk"),
        ],
        correct: 'c',
        explanation: "Solar panels on satellites collect energy from sunlight and convert it into electricity, providing power for all the satellite's equipment.",
    },
    Question {
        id: 2,
        prompt: "What is the main job of a satellite's antenna?",
        options: &[
            opt('a', "To communicate with Earth by sending and receiving signals"),
            opt('b', "To take pictures of Earth"),
            opt('c', "To collect solar energy"),
            opt('d', "To propel the satellite through space"),
        ],
        correct: 'a',
        explanation: "The antenna is used for communication, allowing the satellite to send data back to Earth and receive instructions.",
    },
    Question {
        id: 3,
        prompt: "Why do satellites need cameras?",
        options: &[
            opt('a', "To look for aliens"),
            opt('b', "For video calls with astronauts"),
            opt('c', "To take selfies in space"),
            opt('d', "To observe Earth, planets, or stars"),
        ],
        correct: 'd',
        explanation: "Satellites use cameras to observe and collect data about Earth, other planets, stars and galaxies, helping scientists learn more about our universe.",
    },
    Question {
        id: 4,
        prompt: "What does the satellite body (or bus) do?",
        options: &[
            opt('a', "It carries passengers to space"),
            opt('b', "It holds all the parts together and protects them"),
            opt('c', "It helps the satellite move faster"),
            opt('d', "It makes the satellite invisible"),
        ],
        correct: 'b',
        explanation: "The satellite body (or bus) is the main structure that holds all the components together and protects the delicate instruments from harsh space conditions.",
    },
    Question {
        id: 5,
        prompt: "Why do satellites orbit Earth instead of staying in one spot?",
        options: &[
            opt('a', "To avoid space debris"),
            opt('b', "To use less fuel"),
            opt('c', "To cover more area and stay in motion using gravity"),
            opt('d', "Because they're afraid of aliens"),
        ],
        correct: 'c',
        explanation: "Satellites orbit Earth to stay in motion using gravity, which keeps them from falling back to Earth. This also allows them to cover and observe more area as they travel around the planet.",
    },
];

static GUIDED: FlowContent = FlowContent {
    title: "Build Your Own Satellite",
    introduction: "Hello, young space explorer! I'm Astro, your guide to the fascinating world of satellites. Today, we're going to learn about satellites and even design our own virtual satellite together!",
    welcome_message: "Are you ready for an exciting journey into space technology? Let's begin our adventure!",
    ready: "",
    sections: &GUIDED_SECTIONS,
    quiz_intro: "Now let's see how much you've learned about satellites! I'll ask you 5 questions about what we just covered.",
    assembly_instructions: "",
    assembly_complete: "",
    questions: &GUIDED_QUESTIONS,
};

static BUILDER: FlowContent = FlowContent {
    title: "Spacey Satellite Builder",
    introduction: "Hi there, space explorer! I'm Nova, your guide to the stars. To begin our journey, can I use your camera so I can see you? This helps me guide you through building your very own satellite!",
    welcome_message: "Build your own satellite and explore space!",
    ready: "Perfect! I can see you now. Are you ready to start your amazing space adventure? We'll learn about satellites, build one together, and test your knowledge!",
    sections: &BUILDER_SECTIONS,
    quiz_intro: "",
    assembly_instructions: "Now it's your turn to build a satellite! Drag each part to the assembly area. Start with the satellite body as the base, then add the other components.",
    assembly_complete: "Amazing job! Your satellite is complete and ready for launch! What would you like to name it?",
    questions: &BUILDER_QUESTIONS,
};
