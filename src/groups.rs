use crate::error::{Error, Result};
use crate::{Dataset, Members, SpecimenId};
use tracing::info;

/// A named set of specimens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: Members,
    selected: bool,
}

impl Group {
    pub fn new(name: &str, selected: bool) -> Self {
        Self {
            name: name.into(),
            members: Members::new(),
            selected,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &Members {
        &self.members
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// A group as it is handed to or read back from a persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub name: String,
    pub members: Vec<SpecimenId>,
    pub selected: bool,
    pub control: bool,
}

/// Which field of a group a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupQuery {
    Name,
    Members,
    Selected,
    Control,
}

/// Typed answer to a `GroupQuery`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupField<'a> {
    Name(&'a str),
    Members(&'a Members),
    Selected(bool),
    Control(bool),
}

/// Ordered collection of uniquely named groups with an optional control.
///
/// Groups are addressed by position. Removing groups does not move the
/// control index; callers re-check `control()` after a removal.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    groups: Vec<Group>,
    control: Option<usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name == name)
    }

    /// Appends an empty group. Does nothing if the name is taken.
    pub fn add_group(&mut self, name: &str, selected: bool) {
        if self.position(name).is_some() {
            return;
        }
        self.groups.push(Group::new(name, selected));
    }

    /// Removes every group whose name is listed. Unknown names are ignored.
    pub fn remove_groups<S: AsRef<str>>(&mut self, names: &[S]) {
        self.groups
            .retain(|group| !names.iter().any(|name| name.as_ref() == group.name));
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.control = None;
    }

    /// The control index, if one was set. It may be out of range after
    /// groups were removed.
    pub fn control(&self) -> Option<usize> {
        self.control
    }

    /// Designates the control group. Out-of-range indexes are ignored.
    pub fn set_control(&mut self, index: usize) {
        if index >= self.groups.len() {
            return;
        }
        self.control = Some(index);
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.groups.get(index).map_or(false, |group| group.selected)
    }

    pub fn toggle_selected(&mut self, index: usize, value: bool) -> Result<()> {
        self.group_mut(index)?.selected = value;
        Ok(())
    }

    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<()> {
        match self.position(new_name) {
            Some(other) if other != index => return Err(Error::DuplicateGroup(new_name.into())),
            _ => {}
        }
        self.group_mut(index)?.name = new_name.into();
        Ok(())
    }

    /// Adds specimens to a group, skipping those already in it.
    pub fn add_members<I>(&mut self, index: usize, specimens: I) -> Result<()>
    where
        I: IntoIterator<Item = SpecimenId>,
    {
        self.group_mut(index)?.members.extend(specimens);
        Ok(())
    }

    pub fn remove_members<I>(&mut self, index: usize, specimens: I) -> Result<()>
    where
        I: IntoIterator<Item = SpecimenId>,
    {
        let group = self.group_mut(index)?;
        for specimen in specimens {
            group.members.remove(&specimen);
        }
        Ok(())
    }

    pub fn query(&self, index: usize, query: GroupQuery) -> Option<GroupField<'_>> {
        let group = self.groups.get(index)?;
        Some(match query {
            GroupQuery::Name => GroupField::Name(&group.name),
            GroupQuery::Members => GroupField::Members(&group.members),
            GroupQuery::Selected => GroupField::Selected(group.selected),
            GroupQuery::Control => GroupField::Control(self.control == Some(index)),
        })
    }

    /// Checks the registry can be analysed and returns the control index.
    pub fn validate(&self) -> Result<usize> {
        let control = match self.control {
            Some(index) if index < self.groups.len() => index,
            index => {
                return Err(Error::InvalidControl {
                    index,
                    groups: self.groups.len(),
                })
            }
        };
        if self.others(control).next().is_none() {
            return Err(Error::EmptySelection);
        }
        Ok(control)
    }

    /// The control group and the other selected groups, in registry order.
    ///
    /// The control takes part whether or not it is selected. At least one
    /// other group must be selected.
    pub fn participants(&self, control: usize) -> Result<(&Group, Vec<&Group>)> {
        let group = self.groups.get(control).ok_or(Error::InvalidControl {
            index: Some(control),
            groups: self.groups.len(),
        })?;
        let others: Vec<&Group> = self.others(control).map(|(_, g)| g).collect();
        if others.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok((group, others))
    }

    /// Selected groups other than `control`, in registry order.
    pub fn others(&self, control: usize) -> impl Iterator<Item = (usize, &Group)> {
        self.groups
            .iter()
            .enumerate()
            .filter(move |(i, group)| *i != control && group.selected)
    }

    /// Dataset specimens that belong to no group yet.
    pub fn unassigned(&self, dataset: &Dataset) -> Vec<SpecimenId> {
        dataset
            .specimens()
            .into_iter()
            .filter(|specimen| !self.groups.iter().any(|g| g.members.contains(specimen)))
            .collect()
    }

    pub fn export(&self) -> Vec<GroupRecord> {
        self.groups
            .iter()
            .enumerate()
            .map(|(i, group)| GroupRecord {
                name: group.name.clone(),
                members: group.members.iter().copied().collect(),
                selected: group.selected,
                control: self.control == Some(i),
            })
            .collect()
    }

    /// Replaces the registry contents with `records`.
    ///
    /// Records repeating an earlier name are merged into it and keep the
    /// selection of the first one.
    pub fn load<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = GroupRecord>,
    {
        self.clear();
        for record in records {
            self.add_group(&record.name, record.selected);
            if let Some(index) = self.position(&record.name) {
                self.groups[index].members.extend(record.members);
                if record.control {
                    self.control = Some(index);
                }
            }
        }
        info!(groups = self.groups.len(), "groups loaded");
    }

    fn group_mut(&mut self, index: usize) -> Result<&mut Group> {
        self.groups.get_mut(index).ok_or(Error::NoSuchGroup(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn registry(names: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for name in names {
            registry.add_group(name, true);
        }
        registry
    }

    #[test]
    fn test_add_group_ignores_duplicate_names() {
        let mut registry = registry(&["control", "treated"]);
        registry.add_group("control", false);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_selected(0));
    }

    #[test]
    fn test_remove_groups_preserves_order() {
        let mut registry = registry(&["a", "b", "c", "d"]);
        registry.remove_groups(&["b", "zzz", "d"]);
        let names: Vec<&str> = registry.iter().map(Group::name).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_groups_leaves_control_index_alone() {
        let mut registry = registry(&["a", "b", "c"]);
        registry.set_control(2);
        registry.remove_groups(&["a"]);
        assert_eq!(registry.control(), Some(2));
        assert!(matches!(
            registry.validate(),
            Err(crate::error::Error::InvalidControl { index: Some(2), groups: 2 })
        ));
    }

    #[test]
    fn test_set_control_one_past_end_is_ignored() {
        let mut registry = registry(&["a", "b"]);
        registry.set_control(1);
        registry.set_control(2);
        assert_eq!(registry.control(), Some(1));
    }

    #[test]
    fn test_rename_checks_uniqueness() -> std::result::Result<(), Box<dyn Error>> {
        let mut registry = registry(&["a", "b"]);
        assert!(registry.rename(1, "a").is_err());
        registry.rename(1, "b")?;
        registry.rename(1, "c")?;
        assert_eq!(registry.position("c"), Some(1));
        assert!(registry.rename(5, "x").is_err());
        Ok(())
    }

    #[test]
    fn test_members_have_no_duplicates() -> std::result::Result<(), Box<dyn Error>> {
        let mut registry = registry(&["a"]);
        registry.add_members(0, vec![3, 1, 3, 2])?;
        registry.remove_members(0, vec![2])?;
        let members: Vec<u32> = registry.get(0).unwrap().members().iter().copied().collect();
        assert_eq!(members, vec![1, 3]);
        Ok(())
    }

    #[test]
    fn test_validate_requires_control_and_selection() -> std::result::Result<(), Box<dyn Error>> {
        let mut registry = registry(&["control", "treated"]);
        assert!(matches!(
            registry.validate(),
            Err(crate::error::Error::InvalidControl { index: None, .. })
        ));
        registry.set_control(0);
        registry.toggle_selected(1, false)?;
        assert!(matches!(registry.validate(), Err(crate::error::Error::EmptySelection)));
        registry.toggle_selected(1, true)?;
        assert_eq!(registry.validate()?, 0);
        Ok(())
    }

    #[test]
    fn test_participants_need_a_target() -> std::result::Result<(), Box<dyn Error>> {
        let mut registry = registry(&["control", "treated"]);
        registry.toggle_selected(1, false)?;
        assert!(matches!(
            registry.participants(0),
            Err(crate::error::Error::EmptySelection)
        ));
        registry.toggle_selected(1, true)?;
        let (control, others) = registry.participants(0)?;
        assert_eq!(control.name(), "control");
        assert_eq!(others.len(), 1);
        Ok(())
    }

    #[test]
    fn test_query_returns_typed_fields() {
        let mut registry = registry(&["a", "b"]);
        registry.set_control(1);
        assert_eq!(registry.query(0, GroupQuery::Name), Some(GroupField::Name("a")));
        assert_eq!(registry.query(1, GroupQuery::Control), Some(GroupField::Control(true)));
        assert_eq!(registry.query(0, GroupQuery::Selected), Some(GroupField::Selected(true)));
        assert_eq!(registry.query(2, GroupQuery::Members), None);
    }

    #[test]
    fn test_export_then_load_keeps_control() -> std::result::Result<(), Box<dyn Error>> {
        let mut registry = registry(&["a", "b"]);
        registry.add_members(1, vec![4, 5])?;
        registry.set_control(1);
        registry.toggle_selected(0, false)?;

        let records = registry.export();
        assert!(records[1].control);

        let mut loaded = Registry::new();
        loaded.load(records);
        assert_eq!(loaded.control(), Some(1));
        assert!(!loaded.is_selected(0));
        assert!(loaded.is_selected(1));
        assert_eq!(loaded.get(1).unwrap().members().len(), 2);
        Ok(())
    }
}
