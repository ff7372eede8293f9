//! Browser-side snippets used by operations the plain driver API cannot express.
//!
//! Arguments are bound positionally to `arguments[n]`.

/// Dispatch a bubbling, cancelable HTML event. `arguments[0]` element, `arguments[1]` event name.
pub const FIRE_EVENT: &str = "\
if (document.createEventObject) {
  var evt = document.createEventObject();
  return arguments[0].fireEvent('on' + arguments[1], evt);
}
else {
  var evt = document.createEvent('HTMLEvents');
  evt.initEvent(arguments[1], true, true);
  return !arguments[0].dispatchEvent(evt);
}";

/// Assign `arguments[1]` to the value of `arguments[0]`.
pub const SET_VALUE: &str = "arguments[0].value = arguments[1];";

/// Assign the value and replay the last keystroke through jQuery handlers.
/// `arguments[2]` is the character code of the last character.
pub const JQUERY_SET_VALUE: &str = "\
arguments[0].value = arguments[1];
var element = jQuery(arguments[0]);
var e = jQuery.Event('keydown');  e.which = arguments[2]; element.trigger(e);
var e = jQuery.Event('keypress'); e.which = arguments[2]; element.trigger(e);
var e = jQuery.Event('keyup');    e.which = arguments[2]; element.trigger(e);";

/// Whether jQuery is loaded on the page.
pub const JQUERY_AVAILABLE: &str = "return typeof jQuery == 'function';";

/// Append a 1px input of the same type and name as `arguments[1]` to the form `arguments[0]`.
pub const CLONE_FILE_INPUT: &str = "\
var fileInput = document.createElement('input');
fileInput.setAttribute('type', arguments[1].getAttribute('type'));
fileInput.setAttribute('name', arguments[1].getAttribute('name'));
fileInput.style.width = '1px';
fileInput.style.height = '1px';
arguments[0].appendChild(fileInput);
return fileInput;";

/// Whether the image `arguments[0]` finished loading with real content.
pub const IS_IMAGE_LOADED: &str = "\
return arguments[0].complete && typeof arguments[0].naturalWidth != 'undefined' && arguments[0].naturalWidth > 0";

/// Scroll the window to (`arguments[0]`, `arguments[1]`).
pub const SCROLL_TO: &str = "window.scrollTo(arguments[0], arguments[1]);";

/// The element that currently has focus.
pub const ACTIVE_ELEMENT: &str = "return document.activeElement;";
