mod pick_query;
mod ray_picking;

// Re-export the generic picking trait and function
pub use pick_query::{pick_all, PickQuery};

// Re-export ray intersection
pub use ray_picking::{
    intersect_all, intersect_nearest, IntersectHit, IntersectQuery, IntersectionService,
};
