//! Classification vocabularies and their zero-shot prompt tables.
//!
//! Each multi-class enum carries the prompt list fed to the classifier
//! capability; the enum value is what gets persisted. Gate prompts (the
//! binary yes/no questions that decide whether a sub-classification runs at
//! all) live in the classification stage.

use serde::{Deserialize, Serialize};

macro_rules! classification_enum {
    ($name:ident { $($variant:ident => $str:literal, $prompt:literal;)+ }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)+
                }
            }

            pub fn from_str(s: &str) -> Option<Self> {
                match s {
                    $($str => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn prompt(&self) -> &'static str {
                match self {
                    $($name::$variant => $prompt,)+
                }
            }

            pub fn prompts() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.prompt()).collect()
            }
        }
    };
}

classification_enum!(PeopleType {
    Selfie => "selfie",
        "This is a selfie where a person holds the camera, showing their face prominently.";
    Group => "group", "This is a group photo";
    Portrait => "portrait", "This is a portrait photo of a person or persons";
    Crowd => "crowd", "This is a crowd of people";
});

classification_enum!(AnimalType {
    Cat => "cat", "This is a cat";
    Dog => "dog", "This is a dog";
    GuineaPig => "guinea_pig", "This is a guinea pig";
    Rabbit => "rabbit", "This is a rabbit";
    Hamster => "hamster", "This is a hamster";
    Rat => "rat", "This is a rat";
    Bird => "bird", "This is a bird";
    Wildlife => "wildlife", "This is wildlife";
});

classification_enum!(DocumentType {
    BookOrMagazine => "book_or_magazine", "This is a book or a magazine.";
    Receipt => "receipt", "This is a receipt or proof of payment.";
    Screenshot => "screenshot",
        "This is a digital screenshot from a phone or a computer.";
    Ticket => "ticket",
        "This is an event ticket, with information about the event and or the ticket holder.";
    Identity => "identity",
        "This is an identity document, such as an ID card, passport, drivers license, or other identifiable card.";
    Notes => "notes", "This is a person's notes, notebook, or homework.";
    PaymentMethod => "payment_method",
        "This is a payment method, such as a credit card or debit card.";
    Menu => "menu", "This is a restaurant menu.";
    Recipe => "recipe", "This is a recipe to create a meal.";
});

classification_enum!(ObjectType {
    Food => "food", "The focus of this photo is food or a meal.";
    Vehicle => "vehicle", "The focus of this photo is a vehicle, such as a car, bike, or motorcycle.";
    Artwork => "artwork", "The focus of this photo is a piece of artwork.";
    Device => "device", "The focus of this photo is an electronic device.";
    Clothing => "clothing", "The focus of this photo is a piece of clothing.";
    Drink => "drink", "The focus of this photo is a drink or beverage.";
    SportsEquipment => "sports_equipment", "The focus of this photo is sports equipment.";
    Toy => "toy", "The focus of this photo is a toy.";
});

classification_enum!(ActivityType {
    Sports => "sports", "People are playing sports in this image.";
    Fitness => "fitness", "Someone is working out or doing fitness in this image.";
    Dancing => "dancing", "People are dancing in this image.";
    Photography => "photography", "Someone is taking photos or doing photography in this image.";
    Writing => "writing", "Someone is writing in this image.";
    Leisure => "leisure", "A leisure activity, such as reading, gaming, or relaxing, happens here.";
    Traveling => "traveling", "People are traveling in this image.";
    Camping => "camping", "People are camping in this image.";
    WaterActivity => "water_activity", "A water activity, like swimming, diving, or boating, happens here.";
});

classification_enum!(EventType {
    Wedding => "wedding", "This photo was taken at a wedding.";
    Birthday => "birthday", "This photo was taken at a birthday celebration.";
    Celebration => "celebration", "This photo was taken at a celebration.";
    Party => "party", "This photo was taken at a party.";
    Concert => "concert", "This photo was taken at a concert or live music event.";
    WorkConference => "work_conference", "This photo was taken at a work conference.";
    Meeting => "meeting", "This photo was taken during a meeting.";
    Funeral => "funeral", "This photo was taken at a funeral.";
    Christmas => "christmas", "This photo was taken during christmas.";
    Halloween => "halloween", "This photo was taken during halloween.";
    NewYears => "new_years", "This photo was taken at a new years celebration.";
    SportsGame => "sports_game", "This photo was taken at a sports game.";
    Competition => "competition", "This photo was taken at a competition.";
    Marathon => "marathon", "This photo was taken at a marathon or running event.";
    Protest => "protest", "This photo was taken at a protest.";
    Parade => "parade", "This photo was taken at a parade.";
    Carnival => "carnival", "This photo was taken at a carnival.";
    Trip => "trip", "This photo was taken on a trip.";
    Picnic => "picnic", "This photo was taken at a picnic.";
});

classification_enum!(SceneType {
    Beach => "beach", "a photo taken at the beach";
    Mountain => "mountain", "a photo taken in the mountains";
    Forest => "forest", "a photo taken in a forest";
    Desert => "desert", "a photo taken in a desert";
    Lake => "lake", "a photo taken at a lake";
    River => "river", "a photo taken at a river";
    Snow => "snow", "a photo taken in a snowy landscape";
    Field => "field", "a photo taken in a field or meadow";
    Garden => "garden", "a photo taken in a garden";
    Park => "park", "a photo taken in a park";
    Playground => "playground", "a photo taken at a playground";
    Street => "street", "a photo taken on a city street";
    Highway => "highway", "a photo taken on a highway or road";
    Bridge => "bridge", "a photo of a bridge";
    Harbor => "harbor", "a photo taken at a harbor or marina";
    Airport => "airport", "a photo taken at an airport";
    TrainStation => "train_station", "a photo taken at a train station";
    Museum => "museum", "a photo taken inside a museum";
    Church => "church", "a photo taken at a church or place of worship";
    Stadium => "stadium", "a photo taken in a stadium or sports arena";
    Restaurant => "restaurant", "a photo taken in a restaurant or cafe";
    Bar => "bar", "a photo taken in a bar or pub";
    Shop => "shop", "a photo taken in a shop or market";
    Office => "office", "a photo taken in an office";
    Classroom => "classroom", "a photo taken in a classroom";
    Kitchen => "kitchen", "a photo taken in a kitchen";
    LivingRoom => "living_room", "a photo taken in a living room";
    Bedroom => "bedroom", "a photo taken in a bedroom";
    Bathroom => "bathroom", "a photo taken in a bathroom";
    Pool => "pool", "a photo taken at a swimming pool";
    Campsite => "campsite", "a photo taken at a campsite";
    Concert => "concert_hall", "a photo taken at a concert venue";
    Unknown => "unknown", "a photo of something";
});

impl Default for SceneType {
    fn default() -> Self {
        SceneType::Unknown
    }
}

/// Weather condition codes, matching the meteostat hourly `coco` field.
/// <https://dev.meteostat.net/formats.html#weather-condition-codes>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    Fair,
    Cloudy,
    Overcast,
    Fog,
    FreezingFog,
    LightRain,
    Rain,
    HeavyRain,
    FreezingRain,
    HeavyFreezingRain,
    Sleet,
    HeavySleet,
    LightSnowfall,
    Snowfall,
    HeavySnowfall,
    RainShower,
    HeavyRainShower,
    SleetShower,
    HeavySleetShower,
    SnowShower,
    HeavySnowShower,
    Lightning,
    Hail,
    Thunderstorm,
    HeavyThunderstorm,
    Storm,
}

impl WeatherCondition {
    pub const ALL: &'static [WeatherCondition] = &[
        WeatherCondition::Clear,
        WeatherCondition::Fair,
        WeatherCondition::Cloudy,
        WeatherCondition::Overcast,
        WeatherCondition::Fog,
        WeatherCondition::FreezingFog,
        WeatherCondition::LightRain,
        WeatherCondition::Rain,
        WeatherCondition::HeavyRain,
        WeatherCondition::FreezingRain,
        WeatherCondition::HeavyFreezingRain,
        WeatherCondition::Sleet,
        WeatherCondition::HeavySleet,
        WeatherCondition::LightSnowfall,
        WeatherCondition::Snowfall,
        WeatherCondition::HeavySnowfall,
        WeatherCondition::RainShower,
        WeatherCondition::HeavyRainShower,
        WeatherCondition::SleetShower,
        WeatherCondition::HeavySleetShower,
        WeatherCondition::SnowShower,
        WeatherCondition::HeavySnowShower,
        WeatherCondition::Lightning,
        WeatherCondition::Hail,
        WeatherCondition::Thunderstorm,
        WeatherCondition::HeavyThunderstorm,
        WeatherCondition::Storm,
    ];

    pub fn code(&self) -> i32 {
        Self::ALL
            .iter()
            .position(|c| c == self)
            .map(|i| i as i32 + 1)
            .unwrap_or(0)
    }

    pub fn from_code(code: i32) -> Option<Self> {
        if code < 1 {
            return None;
        }
        Self::ALL.get(code as usize - 1).copied()
    }

    /// Prompt used when classifying visible weather from a photo.
    pub fn prompt(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "The weather is clear with a blue sky.",
            WeatherCondition::Fair => "The weather is fair with some clouds.",
            WeatherCondition::Cloudy => "The weather is cloudy.",
            WeatherCondition::Overcast => "The sky is fully overcast and gray.",
            WeatherCondition::Fog => "It is foggy.",
            WeatherCondition::FreezingFog => "There is freezing fog.",
            WeatherCondition::LightRain => "It is lightly raining or drizzling.",
            WeatherCondition::Rain => "It is raining.",
            WeatherCondition::HeavyRain => "It is raining heavily.",
            WeatherCondition::FreezingRain => "There is freezing rain.",
            WeatherCondition::HeavyFreezingRain => "There is heavy freezing rain.",
            WeatherCondition::Sleet => "There is sleet falling.",
            WeatherCondition::HeavySleet => "There is heavy sleet falling.",
            WeatherCondition::LightSnowfall => "It is lightly snowing.",
            WeatherCondition::Snowfall => "It is snowing.",
            WeatherCondition::HeavySnowfall => "It is snowing heavily.",
            WeatherCondition::RainShower => "There is a rain shower.",
            WeatherCondition::HeavyRainShower => "There is a heavy rain shower.",
            WeatherCondition::SleetShower => "There is a sleet shower.",
            WeatherCondition::HeavySleetShower => "There is a heavy sleet shower.",
            WeatherCondition::SnowShower => "There is a snow shower.",
            WeatherCondition::HeavySnowShower => "There is a heavy snow shower.",
            WeatherCondition::Lightning => "There is visible lightning.",
            WeatherCondition::Hail => "It is hailing.",
            WeatherCondition::Thunderstorm => "There is a thunderstorm.",
            WeatherCondition::HeavyThunderstorm => "There is a heavy thunderstorm.",
            WeatherCondition::Storm => "There is a storm with strong wind.",
        }
    }

    pub fn prompts() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.prompt()).collect()
    }
}
