/// Symptoms the user has picked, in the order they were picked.
///
/// Membership is exact string equality. Inserting a symptom that is already present
/// changes nothing, including its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedSymptoms(Vec<String>);

impl SelectedSymptoms {
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.0.push(name.to_string());
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s != name);
        self.0.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|s| s == name)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}
