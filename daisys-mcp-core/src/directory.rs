//! Filtering and sorting of voice and model listings. Pure transforms over
//! records already fetched from the API.

use std::cmp::Ordering;

use strum::{Display, EnumString};

use crate::api::types::{Gender, TtsModel, Voice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum VoiceSortField {
    #[default]
    Name,
    VoiceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModelSortField {
    #[default]
    Name,
    Displayname,
}

pub fn filter_voices(
    voices: Vec<Voice>,
    model: Option<&str>,
    gender: Option<Gender>,
) -> Vec<Voice> {
    voices
        .into_iter()
        .filter(|voice| model.map_or(true, |m| voice.model == m))
        .filter(|voice| gender.map_or(true, |g| voice.gender == g))
        .collect()
}

pub fn sort_voices(voices: &mut [Voice], field: VoiceSortField, direction: SortDirection) {
    voices.sort_by(|a, b| {
        let ordering = match field {
            VoiceSortField::Name => compare_ci(&a.name, &b.name),
            VoiceSortField::VoiceId => compare_ci(&a.voice_id, &b.voice_id),
        };
        apply_direction(ordering, direction)
    });
}

/// Keeps models matching the language filter by first character only. A
/// filter of "nl" retains every model advertising any language that starts
/// with `n`, case-insensitively. Coarse, but it matches how model language
/// lists group regional variants under one letter family.
pub fn filter_models(models: Vec<TtsModel>, language: Option<&str>) -> Vec<TtsModel> {
    let Some(prefix) = language.and_then(|l| l.chars().next()) else {
        return models;
    };
    let prefix = prefix.to_ascii_lowercase();
    models
        .into_iter()
        .filter(|model| {
            model.languages.iter().any(|language| {
                language.chars().next().map(|c| c.to_ascii_lowercase()) == Some(prefix)
            })
        })
        .collect()
}

pub fn sort_models(models: &mut [TtsModel], field: ModelSortField, direction: SortDirection) {
    models.sort_by(|a, b| {
        let ordering = match field {
            ModelSortField::Name => compare_ci(&a.name, &b.name),
            ModelSortField::Displayname => compare_ci(&a.displayname, &b.displayname),
        };
        apply_direction(ordering, direction)
    });
}

fn compare_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn apply_direction(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: &str, name: &str, gender: Gender, model: &str) -> Voice {
        Voice {
            voice_id: id.to_string(),
            name: name.to_string(),
            gender,
            model: model.to_string(),
            description: None,
            example_take_id: None,
            done_webhook: None,
        }
    }

    fn model(name: &str, languages: &[&str]) -> TtsModel {
        TtsModel {
            name: name.to_string(),
            displayname: name.to_uppercase(),
            flags: None,
            languages: languages.iter().map(|l| l.to_string()).collect(),
            genders: vec![],
            styles: vec![],
            prosody_types: vec![],
        }
    }

    fn sample_voices() -> Vec<Voice> {
        vec![
            voice("v1", "beatrice", Gender::Female, "english-v3.0"),
            voice("v2", "Albert", Gender::Male, "english-v3.0"),
            voice("v3", "charlie", Gender::Nonbinary, "dutch-v1.0"),
        ]
    }

    #[test]
    fn filters_by_model_and_gender() {
        let by_model = filter_voices(sample_voices(), Some("english-v3.0"), None);
        assert_eq!(by_model.len(), 2);

        let by_gender = filter_voices(sample_voices(), None, Some(Gender::Male));
        assert_eq!(by_gender.len(), 1);
        assert_eq!(by_gender[0].name, "Albert");

        let both = filter_voices(sample_voices(), Some("dutch-v1.0"), Some(Gender::Male));
        assert!(both.is_empty());
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let mut voices = sample_voices();
        sort_voices(&mut voices, VoiceSortField::Name, SortDirection::Asc);
        let names: Vec<&str> = voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Albert", "beatrice", "charlie"]);
    }

    #[test]
    fn descending_sort_is_exact_reverse_of_ascending() {
        let mut ascending = sample_voices();
        sort_voices(&mut ascending, VoiceSortField::Name, SortDirection::Asc);

        let mut descending = sample_voices();
        sort_voices(&mut descending, VoiceSortField::Name, SortDirection::Desc);

        let forward: Vec<&str> = ascending.iter().map(|v| v.name.as_str()).collect();
        let mut backward: Vec<&str> = descending.iter().map(|v| v.name.as_str()).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn language_filter_matches_on_first_character() {
        let models = vec![
            model("dutch-v1.0", &["nl-NL", "nl-BE"]),
            model("norwegian-v1.0", &["nb-NO"]),
            model("english-v3.0", &["en-US", "en-GB"]),
        ];
        let filtered = filter_models(models, Some("nl"));
        let names: Vec<&str> = filtered.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["dutch-v1.0", "norwegian-v1.0"]);
    }

    #[test]
    fn empty_language_filter_keeps_everything() {
        let models = vec![model("english-v3.0", &["en-US"])];
        assert_eq!(filter_models(models.clone(), None).len(), 1);
        assert_eq!(filter_models(models, Some("")).len(), 1);
    }

    #[test]
    fn model_sort_by_displayname() {
        let mut models = vec![
            model("b-model", &["en"]),
            model("a-model", &["en"]),
        ];
        sort_models(&mut models, ModelSortField::Displayname, SortDirection::Asc);
        assert_eq!(models[0].name, "a-model");
        sort_models(&mut models, ModelSortField::Displayname, SortDirection::Desc);
        assert_eq!(models[0].name, "b-model");
    }
}
