//! Group kind for compound objects such as ruler guides and imported artwork.

use super::{ObjectBody, ObjectStyle, SceneObject};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// Children placed in the group's local space.
///
/// The group moves, scales, hides and deletes as one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub children: Vec<SceneObject>,
}

impl Group {
    pub fn new(children: Vec<SceneObject>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
}

impl ObjectBody for Group {
    fn local_bounds(&self) -> Rect {
        let mut iter = self.children.iter().map(SceneObject::bounds);
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(first, |acc, b| acc.union(b))
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for child in &self.children {
            for el in child.world_path().elements() {
                path.push(*el);
            }
        }
        path
    }

    fn hit_test(&self, point: Point, tolerance: f64, _style: &ObjectStyle) -> bool {
        self.children
            .iter()
            .any(|child| child.visible && child.hit_test(point, tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ObjectKind, Rectangle};

    #[test]
    fn test_group_bounds_union() {
        let a = SceneObject::new(ObjectKind::Rect(Rectangle::new(10.0, 10.0)));
        let b = SceneObject::new(ObjectKind::Rect(Rectangle::new(10.0, 10.0))).at(20.0, 5.0);
        let group = Group::new(vec![a, b]);
        assert_eq!(group.local_bounds(), Rect::new(0.0, 0.0, 30.0, 15.0));
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_empty_group() {
        let group = Group::new(Vec::new());
        assert!(group.is_empty());
        assert_eq!(group.local_bounds(), Rect::ZERO);
    }

    #[test]
    fn test_group_hit_test_children() {
        let a = SceneObject::new(ObjectKind::Rect(Rectangle::new(10.0, 10.0))).at(50.0, 50.0);
        let group = Group::new(vec![a]);
        let style = ObjectStyle::default();
        assert!(group.hit_test(Point::new(55.0, 55.0), 0.0, &style));
        assert!(!group.hit_test(Point::new(5.0, 5.0), 0.0, &style));
    }
}
