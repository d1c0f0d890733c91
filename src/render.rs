//! Frame composition
//!
//! Draws the whole screen from a [`DisplayState`]: sprite, mood name, divider,
//! activity, wrapped message and the status bar. All positions are fixed
//! offsets for the 480×800 portrait panel.

use embedded_graphics::{
    image::{Image, ImageRaw},
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::Text,
};
use profont::{PROFONT_12_POINT, PROFONT_18_POINT, PROFONT_24_POINT};

use crate::config::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::layout::{draw_wrapped, truncate_with_ellipsis, WrapParams};
use crate::state::{DisplayState, MAX_MESSAGE_CHARS};

/// Ink color; the background is `BinaryColor::Off`
pub const INK: BinaryColor = BinaryColor::On;

const FONT_LARGE: &MonoFont<'static> = &PROFONT_24_POINT;
const FONT_MEDIUM: &MonoFont<'static> = &PROFONT_18_POINT;
const FONT_SMALL: &MonoFont<'static> = &PROFONT_12_POINT;

const WIDTH: i32 = DISPLAY_WIDTH as i32;
const HEIGHT: i32 = DISPLAY_HEIGHT as i32;

const SPRITE_TOP: i32 = 50;
const MOOD_NAME_GAP: i32 = 50;
const MOOD_NAME_X: i32 = 50;
const DIVIDER_GAP: i32 = 20;
const DIVIDER_MARGIN: i32 = 30;
const ACTIVITY_GAP: i32 = 40;
const ACTIVITY_X: i32 = 30;
const ACTIVITY_MAX_CHARS: usize = 35;
const MESSAGE_GAP: i32 = 45;

/// Geometry of the message block (origin is filled in per frame)
pub const MESSAGE_WRAP: WrapParams = WrapParams {
    chars_per_line: 28,
    line_height: 24,
    max_lines: 15,
    origin: Point::new(50, 0),
};

const STATUS_BOTTOM_GAP: i32 = 30;
const STATUS_BATTERY_X: i32 = 30;
const STATUS_WIFI_X: i32 = 180;
const STATUS_MQTT_X: i32 = 300;

const NOTICE_X: i32 = 30;
const NOTICE_TITLE_Y: i32 = 350;
const NOTICE_SUBTITLE_Y: i32 = 400;
const NOTICE_DETAIL_Y: i32 = 460;

/// Connectivity shown in the status bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStatus {
    pub wifi: bool,
    pub mqtt: bool,
}

/// Transient full-screen message shown during boot and reconnection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice<'a> {
    pub title: &'a str,
    pub subtitle: Option<&'a str>,
    pub detail: Option<&'a str>,
}

impl<'a> Notice<'a> {
    pub const fn new(title: &'a str) -> Self {
        Self {
            title,
            subtitle: None,
            detail: None,
        }
    }

    pub const fn with_subtitle(mut self, subtitle: &'a str) -> Self {
        self.subtitle = Some(subtitle);
        self
    }

    pub const fn with_detail(mut self, detail: &'a str) -> Self {
        self.detail = Some(detail);
        self
    }
}

fn ok_or_dash(up: bool) -> &'static str {
    if up {
        "OK"
    } else {
        "--"
    }
}

/// Draw the full state screen
pub fn render_state<D>(target: &mut D, state: &DisplayState, links: LinkStatus) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    // Sprite centered at top
    let sprite = state.mood().sprite();
    let raw = ImageRaw::<BinaryColor>::new(sprite.data, sprite.width);
    let sprite_x = (WIDTH - sprite.width as i32) / 2;
    Image::new(&raw, Point::new(sprite_x, SPRITE_TOP)).draw(target)?;

    let large = MonoTextStyle::new(FONT_LARGE, INK);
    let medium = MonoTextStyle::new(FONT_MEDIUM, INK);
    let small = MonoTextStyle::new(FONT_SMALL, INK);

    let mut text_y = SPRITE_TOP + sprite.height as i32 + MOOD_NAME_GAP;
    Text::new(
        state.mood().display_name(),
        Point::new(MOOD_NAME_X, text_y),
        large,
    )
    .draw(target)?;

    text_y += DIVIDER_GAP;
    Line::new(
        Point::new(DIVIDER_MARGIN, text_y),
        Point::new(WIDTH - DIVIDER_MARGIN, text_y),
    )
    .into_styled(PrimitiveStyle::with_stroke(INK, 1))
    .draw(target)?;

    text_y += ACTIVITY_GAP;
    let activity = truncate_with_ellipsis(state.activity(), ACTIVITY_MAX_CHARS);
    Text::new(&activity, Point::new(ACTIVITY_X, text_y), medium).draw(target)?;

    if !state.message().is_empty() {
        text_y += MESSAGE_GAP;
        let message = truncate_with_ellipsis(state.message(), MAX_MESSAGE_CHARS);
        let params = WrapParams {
            origin: Point::new(MESSAGE_WRAP.origin.x, text_y),
            ..MESSAGE_WRAP
        };
        draw_wrapped(target, &message, medium, &params)?;
    }

    // Bottom status bar
    let bottom_y = HEIGHT - STATUS_BOTTOM_GAP;
    let battery = format!("Bat:{}%", state.battery_percent());
    Text::new(&battery, Point::new(STATUS_BATTERY_X, bottom_y), small).draw(target)?;

    let wifi = format!("WiFi:{}", ok_or_dash(links.wifi));
    Text::new(&wifi, Point::new(STATUS_WIFI_X, bottom_y), small).draw(target)?;

    let mqtt = format!("MQTT:{}", ok_or_dash(links.mqtt));
    Text::new(&mqtt, Point::new(STATUS_MQTT_X, bottom_y), small).draw(target)?;

    Ok(())
}

/// Draw a transient status screen
pub fn render_notice<D>(target: &mut D, notice: &Notice<'_>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    let large = MonoTextStyle::new(FONT_LARGE, INK);
    Text::new(notice.title, Point::new(NOTICE_X, NOTICE_TITLE_Y), large).draw(target)?;

    if let Some(subtitle) = notice.subtitle {
        Text::new(subtitle, Point::new(NOTICE_X, NOTICE_SUBTITLE_Y), large).draw(target)?;
    }

    if let Some(detail) = notice.detail {
        let medium = MonoTextStyle::new(FONT_MEDIUM, INK);
        Text::new(detail, Point::new(NOTICE_X, NOTICE_DETAIL_Y), medium).draw(target)?;
    }

    Ok(())
}
