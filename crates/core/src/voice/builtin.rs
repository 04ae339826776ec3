use super::Voice;

// (id, name, gender, language, country)
const VOICES: &[(&str, &str, &str, &str, &str)] = &[
    ("voice-107", "Andrew Multilingual", "Male", "English", "United States"),
    ("voice-110", "Ava Multilingual", "Female", "English", "United States"),
    ("voice-112", "Brian Multilingual", "Male", "English", "United States"),
    ("voice-115", "Emma Multilingual", "Female", "English", "United States"),
    ("voice-35", "Andrew", "Male", "English", "United States"),
    ("voice-36", "Aria", "Female", "English", "United States"),
    ("voice-37", "Ava", "Female", "English", "United States"),
    ("voice-38", "Brian", "Male", "English", "United States"),
    ("voice-39", "Christopher", "Male", "English", "United States"),
    ("voice-40", "Emma", "Female", "English", "United States"),
    ("voice-41", "Eric", "Male", "English", "United States"),
    ("voice-42", "Guy", "Male", "English", "United States"),
    ("voice-43", "Jenny", "Female", "English", "United States"),
    ("voice-44", "Michelle", "Female", "English", "United States"),
    ("voice-45", "Roger", "Male", "English", "United States"),
    ("voice-46", "Steffan", "Male", "English", "United States"),
    ("voice-20", "Libby", "Female", "English", "United Kingdom"),
    ("voice-21", "Maisie", "Female", "English", "United Kingdom"),
    ("voice-22", "Ryan", "Male", "English", "United Kingdom"),
    ("voice-23", "Sonia", "Female", "English", "United Kingdom"),
    ("voice-24", "Thomas", "Male", "English", "United Kingdom"),
    ("voice-1", "Natasha", "Female", "English", "Australia"),
    ("voice-2", "William", "Male", "English", "Australia"),
    ("voice-10", "Clara", "Female", "English", "Canada"),
    ("voice-11", "Liam", "Male", "English", "Canada"),
    ("voice-26", "Neerja", "Female", "English", "India"),
    ("voice-27", "Prabhat", "Male", "English", "India"),
    ("voice-33", "Connor", "Male", "English", "Ireland"),
    ("voice-34", "Emily", "Female", "English", "Ireland"),
    ("voice-130", "Seraphina Multilingual", "Female", "German", "Germany"),
    ("voice-131", "Florian Multilingual", "Male", "German", "Germany"),
    ("voice-132", "Katja", "Female", "German", "Germany"),
    ("voice-133", "Conrad", "Male", "German", "Germany"),
    ("voice-140", "Vivienne Multilingual", "Female", "French", "France"),
    ("voice-141", "Remy Multilingual", "Male", "French", "France"),
    ("voice-142", "Denise", "Female", "French", "France"),
    ("voice-143", "Henri", "Male", "French", "France"),
    ("voice-150", "Elvira", "Female", "Spanish", "Spain"),
    ("voice-151", "Alvaro", "Male", "Spanish", "Spain"),
    ("voice-152", "Dalia", "Female", "Spanish", "Mexico"),
    ("voice-153", "Jorge", "Male", "Spanish", "Mexico"),
    ("voice-160", "Francisca", "Female", "Portuguese", "Brazil"),
    ("voice-161", "Antonio", "Male", "Portuguese", "Brazil"),
    ("voice-170", "Elsa", "Female", "Italian", "Italy"),
    ("voice-171", "Diego", "Male", "Italian", "Italy"),
    ("voice-180", "Nanami", "Female", "Japanese", "Japan"),
    ("voice-181", "Keita", "Male", "Japanese", "Japan"),
    ("voice-190", "SunHi", "Female", "Korean", "Korea"),
    ("voice-191", "InJoon", "Male", "Korean", "Korea"),
    ("voice-200", "Xiaoxiao", "Female", "Chinese", "China"),
    ("voice-201", "Yunxi", "Male", "Chinese", "China"),
    ("voice-210", "Swara", "Female", "Hindi", "India"),
    ("voice-211", "Madhur", "Male", "Hindi", "India"),
    ("voice-220", "Zariyah", "Female", "Arabic", "Saudi Arabia"),
    ("voice-221", "Hamed", "Male", "Arabic", "Saudi Arabia"),
];

pub(super) fn voices() -> Vec<Voice> {
    VOICES
        .iter()
        .map(|&(id, name, gender, language, country)| Voice {
            id: id.to_owned(),
            name: name.to_owned(),
            gender: gender.to_owned(),
            language: language.to_owned(),
            country: country.to_owned(),
        })
        .collect()
}
