//! `random_pet`: memorable random names such as `gently-brave-otter`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{count, from_state, to_state, Keepers, ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::random;
use crate::schema::{Attribute, Schema, Validator};

const DEFAULT_LENGTH: i64 = 2;
const DEFAULT_SEPARATOR: &str = "-";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PetModel {
    #[serde(default)]
    keepers: Keepers,
    #[serde(default)]
    length: Option<i64>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    separator: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

/// Build a pet name of `length` words: adverbs, then an adjective, then a name.
fn pet_name<R: Rng + ?Sized>(rng: &mut R, length: usize, separator: &str) -> String {
    let mut pick = |words: &[&'static str]| words[rng.random_range(0..words.len())];
    let words: Vec<&str> = match length {
        0 => Vec::new(),
        1 => vec![pick(NAMES)],
        2 => vec![pick(ADJECTIVES), pick(NAMES)],
        n => {
            let mut words: Vec<&str> = (0..n - 2).map(|_| pick(ADVERBS)).collect();
            words.push(pick(ADJECTIVES));
            words.push(pick(NAMES));
            words
        },
    };
    words.join(separator)
}

/// `random_pet`
pub struct PetResource;

impl ResourceHandler for PetResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Pet
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "The resource random_pet generates random pet names that are intended to be used \
                 as unique identifiers for other resources.",
            )
            .with_attribute("keepers", Attribute::keepers())
            .with_attribute(
                "length",
                Attribute::optional_computed_int64()
                    .with_default(Value::from(DEFAULT_LENGTH))
                    .requires_replace()
                    .with_validator(Validator::AtLeast(1))
                    .with_description("The length (in words) of the pet name. Defaults to 2."),
            )
            .with_attribute(
                "prefix",
                Attribute::optional_string()
                    .requires_replace()
                    .with_description("A string to prefix the name with."),
            )
            .with_attribute(
                "separator",
                Attribute::optional_computed_string()
                    .with_default(Value::from(DEFAULT_SEPARATOR))
                    .requires_replace()
                    .with_description("The character to separate words in the pet name. Defaults to \"-\"."),
            )
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("The random pet name."),
            )
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let mut model: PetModel = from_state(planned)?;
        let length = *model.length.get_or_insert(DEFAULT_LENGTH);
        let separator = model
            .separator
            .get_or_insert_with(|| DEFAULT_SEPARATOR.to_string())
            .clone();

        let mut rng = random::secure_rng(self.kind().type_name())?;
        let words = pet_name(&mut rng, count(self.kind(), "length", length)?, &separator);
        let mut name = words.to_lowercase();
        if let Some(prefix) = model.prefix.as_deref().filter(|p| !p.is_empty()) {
            name = format!("{}{}{}", prefix, separator, name);
        }
        debug!(length, "Generated random pet name");
        model.id = Some(name);
        to_state(&model)
    }
}

const ADJECTIVES: &[&str] = &[
    "able", "active", "adapted", "adequate", "adjusted", "admired", "alert", "amazed", "amazing",
    "amused", "apparent", "awake", "aware", "balanced", "beloved", "better", "big", "bold",
    "brave", "bright", "brief", "busy", "calm", "capable", "careful", "casual", "causal",
    "certain", "charmed", "cheerful", "choice", "civil", "clean", "clear", "clever", "close",
    "comic", "communal", "complete", "concise", "content", "cool", "correct", "cosmic", "crack",
    "creative", "credible", "crisp", "cuddly", "curious", "cute", "decent", "deep", "deciding",
    "definite", "delicate", "direct", "distinct", "divine", "driven", "dynamic", "eager",
    "easy", "electric", "elegant", "enabled", "endless", "engaged", "enormous", "epic",
    "equal", "eternal", "ethical", "exact", "excited", "exotic", "expert", "fair", "famous",
    "fancy", "fast", "fine", "firm", "fitting", "flowing", "fluent", "flying", "fond",
    "frank", "free", "fresh", "full", "funny", "game", "generous", "gentle", "genuine",
    "giving", "glad", "glorious", "golden", "good", "gorgeous", "grand", "grateful", "great",
    "growing", "guided", "handy", "happy", "hardy", "harmless", "healthy", "helped",
    "helpful", "heroic", "holy", "honest", "hopeful", "huge", "humane", "humble", "ideal",
    "immense", "innocent", "integral", "intent", "internal", "joint", "just", "keen", "key",
    "kind", "large", "lasting", "legal", "liberal", "light", "literate", "live", "lively",
    "logical", "loved", "loving", "loyal", "lucky", "magical", "main", "major", "massive",
    "master", "mature", "maximum", "measured", "merry", "mighty", "mint", "modest", "moral",
    "moved", "musical", "mutual", "natural", "neat", "needed", "new", "nice", "noble",
    "normal", "notable", "novel", "obliging", "on", "open", "optimal", "organic", "origin",
    "patient", "peaceful", "perfect", "picked", "pleased", "pleasing", "polite", "popular",
    "positive", "possible", "powerful", "precious", "precise", "premium", "prepared",
    "present", "pretty", "primary", "prime", "pro", "probable", "profound", "promoted",
    "prompt", "proper", "proud", "proven", "pumped", "pure", "quality", "quick", "quiet",
    "rapid", "rare", "rational", "ready", "real", "refined", "regular", "related", "relative",
    "relaxed", "relaxing", "relevant", "renewed", "resolved", "rested", "rich", "right",
    "robust", "romantic", "ruling", "sacred", "safe", "saved", "secure", "select", "sensible",
    "set", "settled", "sharp", "shining", "simple", "singular", "skilled", "smart", "smashing",
    "smiling", "smooth", "social", "solid", "sought", "sound", "special", "splendid",
    "square", "stable", "star", "steady", "sterling", "still", "stirred", "stirring",
    "striking", "strong", "stunning", "subtle", "suitable", "super", "superb", "supreme",
    "sure", "sweeping", "sweet", "swift", "talented", "teaching", "tender", "thankful",
    "thorough", "tidy", "tight", "together", "tolerant", "top", "topical", "tough", "trusted",
    "trusting", "trusty", "ultimate", "unbiased", "uncommon", "unified", "unique", "united",
    "up", "upright", "upward", "usable", "useful", "valid", "valued", "vast", "verified",
    "viable", "vital", "vocal", "wanted", "warm", "wealthy", "welcome", "well", "whole",
    "willing", "winning", "wired", "wise", "witty", "wondrous", "workable", "working",
    "worthy",
];

const ADVERBS: &[&str] = &[
    "abnormally", "absolutely", "accurately", "actively", "actually", "adequately",
    "admittedly", "adversely", "allegedly", "amazingly", "annually", "apparently",
    "arguably", "awfully", "badly", "barely", "basically", "blatantly", "blindly", "briefly",
    "brightly", "broadly", "carefully", "centrally", "certainly", "cheaply", "cleanly",
    "clearly", "closely", "commonly", "completely", "constantly", "conversely", "correctly",
    "curiously", "currently", "daily", "deadly", "deeply", "definitely", "deliberately",
    "densely", "depending", "desperately", "directly", "distinctly", "early", "easily",
    "eminently", "enabling", "endlessly", "enormously", "entirely", "equally", "especially",
    "evenly", "evidently", "exactly", "explicitly", "externally", "extremely", "factually",
    "fairly", "finally", "firmly", "firstly", "forcibly", "formally", "formerly",
    "frankly", "freely", "frequently", "friendly", "fully", "generally", "gently",
    "genuinely", "ghastly", "gladly", "globally", "gradually", "gratefully", "greatly",
    "grossly", "happily", "hardly", "heartily", "heavily", "hideously", "highly",
    "honestly", "hopefully", "hopelessly", "horribly", "hugely", "humbly", "ideally",
    "illegally", "immensely", "implicitly", "incredibly", "indirectly", "infinitely",
    "informally", "inherently", "initially", "instantly", "intensely", "internally",
    "jointly", "jolly", "kindly", "largely", "lately", "legally", "lightly", "likely",
    "literally", "lively", "locally", "logically", "loosely", "loudly", "lovely", "luckily",
    "mainly", "manually", "marginally", "mentally", "merely", "mildly", "miserably",
    "mistakenly", "moderately", "monthly", "morally", "mostly", "multiply", "mutually",
    "namely", "nationally", "naturally", "nearly", "neatly", "needlessly", "newly",
    "nicely", "nominally", "normally", "notably", "noticeably", "obviously", "oddly",
    "officially", "only", "openly", "optionally", "overly", "painfully", "partially",
    "partly", "perfectly", "personally", "physically", "plainly", "pleasantly", "poorly",
    "positively", "possibly", "precisely", "preferably", "presently", "presumably",
    "previously", "primarily", "privately", "probably", "promptly", "properly", "publicly",
    "purely", "quickly", "quietly", "radically", "randomly", "rapidly", "rarely", "rather",
    "readily", "really", "reasonably", "recently", "regularly", "reliably", "remarkably",
    "remotely", "repeatedly", "rightly", "roughly", "routinely", "sadly", "safely",
    "scarcely", "secondly", "secretly", "seemingly", "sensibly", "separately", "seriously",
    "severely", "sharply", "shortly", "similarly", "simply", "sincerely", "singularly",
    "slightly", "slowly", "smoothly", "socially", "solely", "specially", "steadily",
    "strangely", "strictly", "strongly", "subtly", "suddenly", "suitably", "supposedly",
    "surely", "terminally", "terribly", "thankfully", "thoroughly", "tightly", "totally",
    "trivially", "truly", "typically", "ultimately", "unduly", "uniformly", "uniquely",
    "unlikely", "urgently", "usefully", "usually", "utterly", "vaguely", "vastly",
    "verbally", "vertically", "vigorously", "violently", "virtually", "visually", "weekly",
    "wholly", "widely", "wildly", "willingly", "wrongly", "yearly",
];

const NAMES: &[&str] = &[
    "aardvark", "alpaca", "anchovy", "ant", "anteater", "antelope", "ape", "asp", "baboon",
    "badger", "barnacle", "bass", "bat", "bear", "beagle", "beetle", "bengal", "bird",
    "bison", "blowfish", "bluebird", "bluegill", "bobcat", "bream", "buck", "buffalo",
    "bug", "bull", "bulldog", "bunny", "burro", "buzzard", "calf", "camel", "caribou",
    "cat", "catfish", "cattle", "chamois", "cheetah", "chicken", "chigger", "chimp",
    "chipmunk", "cicada", "civet", "clam", "cobra", "cockatoo", "cod", "collie", "colt",
    "condor", "coral", "corgi", "cougar", "cow", "coyote", "crab", "crane", "crappie",
    "cricket", "crow", "cub", "dane", "deer", "dingo", "dodo", "doe", "dog", "dolphin",
    "donkey", "dory", "dove", "dragon", "drake", "drum", "duck", "eagle", "eel", "egret",
    "elephant", "elk", "emu", "escargot", "ewe", "falcon", "fawn", "feline", "ferret",
    "filly", "finch", "fish", "flamingo", "flea", "fly", "foal", "fowl", "fox", "frog",
    "gar", "gazelle", "gecko", "gelding", "ghost", "gibbon", "giraffe", "glider", "gnat",
    "gnu", "goat", "goblin", "goldfish", "goose", "gopher", "gorilla", "grackle",
    "griffon", "grizzly", "grouper", "grouse", "grub", "guinea", "gull", "guppy",
    "haddock", "halibut", "hamster", "hare", "hawk", "hedgehog", "hen", "heron", "herring",
    "hippo", "hog", "honeybee", "hookworm", "hornet", "horse", "hound", "humpback",
    "husky", "hyena", "ibex", "iguana", "impala", "insect", "jackal", "jaguar", "jawfish",
    "jay", "jennet", "joey", "kangaroo", "katydid", "kid", "killdeer", "kingfish",
    "kit", "kite", "kitten", "kiwi", "koala", "lab", "ladybug", "lamb", "lamprey",
    "lark", "leech", "lemming", "lemur", "leopard", "liger", "lion", "lionfish", "lizard",
    "llama", "lobster", "locust", "longhorn", "loon", "louse", "lynx", "macaque",
    "macaw", "magpie", "mako", "malamute", "mallard", "mammal", "mammoth", "man",
    "manatee", "mantis", "marlin", "marmoset", "marmot", "marten", "martin", "mastiff",
    "mayfly", "meerkat", "midge", "mink", "minnow", "mite", "mole", "mollusk", "mongoose",
    "monitor", "monkey", "moose", "moray", "mosquito", "moth", "mouse", "mudfish", "mule",
    "mullet", "muskox", "muskrat", "mustang", "mutt", "narwhal", "newt", "oarfish",
    "ocelot", "octopus", "opossum", "orca", "oriole", "osprey", "ostrich", "owl", "ox",
    "oyster", "panda", "panther", "parakeet", "parrot", "pegasus", "pelican", "penguin",
    "perch", "pheasant", "phoenix", "pig", "pigeon", "piglet", "pika", "pipefish",
    "piranha", "platypus", "polecat", "polliwog", "pony", "poodle", "porpoise", "possum",
    "prawn", "primate", "pug", "puma", "pup", "python", "quagga", "quail", "quetzal",
    "rabbit", "raccoon", "ram", "rat", "raven", "ray", "redbird", "redfish", "reindeer",
    "reptile", "rhino", "robin", "rodent", "rooster", "roughy", "sailfish", "salmon",
    "sawfish", "scorpion", "seagull", "seahorse", "seal", "sheep", "shepherd", "shiner",
    "shrew", "shrimp", "silkworm", "skink", "skunk", "skylark", "sloth", "slug", "snail",
    "snake", "snapper", "snipe", "sole", "sparrow", "spider", "sponge", "squid", "squirrel",
    "stag", "starfish", "stallion", "starling", "stinkbug", "stork", "stud", "sturgeon",
    "sunbeam", "sunbird", "sunfish", "swan", "swift", "swine", "tadpole", "tahr", "tapir",
    "tarpon", "teal", "termite", "terrapin", "terrier", "tetra", "thrush", "tick",
    "tiger", "titmouse", "toad", "tomcat", "tortoise", "toucan", "treefrog", "trout",
    "tuna", "turkey", "turtle", "unicorn", "urchin", "vervet", "viper", "vole", "vulture",
    "wahoo", "walleye", "walrus", "warthog", "wasp", "weasel", "weevil", "werewolf",
    "whale", "whippet", "wildcat", "wolf", "wombat", "woodcock", "worm", "wren", "yak",
    "yeti", "zebra",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded_rng;
    use serde_json::json;

    fn create(config: Value) -> String {
        let planned = crate::plan::propose(&PetResource.schema(), &config);
        let state = PetResource.create(Value::Object(planned)).unwrap();
        state["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_default_name_has_two_words() {
        let name = create(json!({}));
        let words: Vec<&str> = name.split('-').collect();
        assert_eq!(words.len(), 2);
        assert!(ADJECTIVES.contains(&words[0]));
        assert!(NAMES.contains(&words[1]));
    }

    #[test]
    fn test_word_order() {
        let mut rng = seeded_rng("pets");
        let name = pet_name(&mut rng, 4, " ");
        let words: Vec<&str> = name.split(' ').collect();
        assert_eq!(words.len(), 4);
        assert!(ADVERBS.contains(&words[0]));
        assert!(ADVERBS.contains(&words[1]));
        assert!(ADJECTIVES.contains(&words[2]));
        assert!(NAMES.contains(&words[3]));

        let name = pet_name(&mut rng, 1, "-");
        assert!(NAMES.contains(&name.as_str()));
    }

    #[test]
    fn test_prefix_and_separator() {
        let name = create(json!({"length": 3, "prefix": "Web", "separator": "_"}));
        let words = name.strip_prefix("Web_").unwrap();
        assert_eq!(words.split('_').count(), 3);
        assert_eq!(words, words.to_lowercase());
    }

    #[test]
    fn test_empty_prefix_is_ignored() {
        let name = create(json!({"length": 1, "prefix": ""}));
        assert!(NAMES.contains(&name.as_str()));
    }

    #[test]
    fn test_word_lists_are_lower_case() {
        for word in ADJECTIVES.iter().chain(ADVERBS).chain(NAMES) {
            assert_eq!(*word, word.to_lowercase());
            assert!(!word.contains('-'));
        }
    }

    #[test]
    fn test_import_unsupported() {
        let err = PetResource.import("happy-dog").unwrap_err();
        assert!(matches!(err, ProviderError::ImportUnsupported(name) if name == "random_pet"));
    }
}
