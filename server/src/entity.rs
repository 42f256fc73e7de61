use pong_shared::{
    BallView, Direction, PaddleView, BALL_RADIUS, BALL_SPEED, PADDLE_HEIGHT, PADDLE_SPEED,
    PADDLE_WIDTH,
};
use rand::Rng;
use std::f32::consts::FRAC_PI_3;

/// Largest launch angle from horizontal on a respawn (60 degrees).
pub const MAX_LAUNCH_ANGLE: f32 = FRAC_PI_3;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is down, matching canvas coordinates.
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the vector of the given length pointing at `angle` radians below horizontal.
    pub fn from_angle(angle: f32, length: f32) -> Vector2 {
        Vector2 {
            x: length * angle.cos(),
            y: length * angle.sin(),
        }
    }
}

/// Dimensions of the playing field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

impl Default for Field {
    fn default() -> Self {
        Field {
            width: pong_shared::CANVAS_WIDTH,
            height: pong_shared::CANVAS_HEIGHT,
        }
    }
}

impl Field {
    pub fn new(width: f32, height: f32) -> Self {
        Field { width, height }
    }

    /// The vertical line neither paddle may cross.
    pub fn midline(&self) -> f32 {
        self.width / 2.0
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// Which half of the field a paddle lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A player's paddle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub side: Side,
}

impl Paddle {
    pub fn new(x: f32, y: f32, side: Side) -> Self {
        Paddle {
            x,
            y,
            width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
            speed: PADDLE_SPEED,
            side,
        }
    }

    /// Horizontal range the paddle's left edge may occupy.
    pub fn x_bounds(&self, field: Field) -> (f32, f32) {
        match self.side {
            Side::Left => (0.0, field.midline() - self.width),
            Side::Right => (field.midline(), field.width - self.width),
        }
    }

    /// Vertical range the paddle's top edge may occupy.
    pub fn y_bounds(&self, field: Field) -> (f32, f32) {
        (0.0, field.height - self.height)
    }

    /// Moves one step in `direction`, saturating at the paddle's half of the field.
    pub fn shift(&mut self, direction: Direction, field: Field) {
        match direction {
            Direction::Up => self.y -= self.speed,
            Direction::Down => self.y += self.speed,
            Direction::Left => self.x -= self.speed,
            Direction::Right => self.x += self.speed,
        }

        let (min_x, max_x) = self.x_bounds(field);
        let (min_y, max_y) = self.y_bounds(field);
        self.x = self.x.max(min_x).min(max_x);
        self.y = self.y.max(min_y).min(max_y);
    }

    /// Right edge for the left paddle, left edge for the right one.
    pub fn inner_edge(&self) -> f32 {
        match self.side {
            Side::Left => self.x + self.width,
            Side::Right => self.x,
        }
    }

    pub fn spans_y(&self, y: f32) -> bool {
        y >= self.y && y <= self.y + self.height
    }

    pub fn view(&self) -> PaddleView {
        PaddleView {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// The ball. `x`/`y` is the center.
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub velocity: Vector2,
    pub speed: f32,
}

impl Ball {
    /// A ball at rest in the middle of `field`. Call [`Ball::reset`] to launch it.
    pub fn new(field: Field) -> Self {
        let (x, y) = field.center();
        Ball {
            x,
            y,
            radius: BALL_RADIUS,
            velocity: Vector2::default(),
            speed: BALL_SPEED,
        }
    }

    /// Recenters the ball and launches it left or right at a random angle
    /// within `MAX_LAUNCH_ANGLE` of horizontal, at exactly `speed`.
    pub fn reset<R: Rng + ?Sized>(&mut self, field: Field, rng: &mut R) {
        let (x, y) = field.center();
        self.x = x;
        self.y = y;

        let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let angle = rng.gen_range(-MAX_LAUNCH_ANGLE..=MAX_LAUNCH_ANGLE);

        let launch = Vector2::from_angle(angle, self.speed);
        self.velocity = Vector2::new(launch.x * direction, launch.y);
    }

    pub fn update_position(&mut self) {
        self.x += self.velocity.x;
        self.y += self.velocity.y;
    }

    pub fn reverse_x(&mut self) {
        self.velocity.x = -self.velocity.x;
    }

    pub fn reverse_y(&mut self) {
        self.velocity.y = -self.velocity.y;
    }

    pub fn left_edge(&self) -> f32 {
        self.x - self.radius
    }

    pub fn right_edge(&self) -> f32 {
        self.x + self.radius
    }

    pub fn view(&self) -> BallView {
        BallView {
            x: self.x,
            y: self.y,
            radius: self.radius,
        }
    }
}
